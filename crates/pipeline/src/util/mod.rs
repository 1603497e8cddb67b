mod threadpool;

pub use threadpool::ThreadPool;
