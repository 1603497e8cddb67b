use crate::Error;
use spirv::{BuiltIn, Decoration};

/// Accumulated decorations for one id (or one struct member). Orthogonal
/// annotations merge freely; the exclusive fields (descriptor set, binding)
/// must agree between contributions or the module is malformed.
#[derive(Clone, Copy, Debug, Default)]
pub struct Decorations {
    pub location: Option<i32>,
    pub component: Option<u32>,
    pub built_in: Option<BuiltIn>,
    pub flat: bool,
    pub no_perspective: bool,
    pub centroid: bool,
    pub block: bool,
    pub buffer_block: bool,
    pub descriptor_set: Option<u32>,
    pub binding: Option<u32>,
}

impl Decorations {
    pub fn apply(&mut self, id: u32, decoration: Decoration, arg: Option<u32>) -> Result<(), Error> {
        let arg_or = |what| arg.ok_or(Error::InvalidEnumValue { what, value: 0 });
        match decoration {
            Decoration::Location => self.location = Some(arg_or("location")? as i32),
            Decoration::Component => self.component = Some(arg_or("component")?),
            Decoration::BuiltIn => {
                let value = arg_or("builtin")?;
                let built_in = <BuiltIn as num_traits::FromPrimitive>::from_u32(value)
                    .ok_or(Error::InvalidEnumValue {
                        what: "builtin",
                        value,
                    })?;
                self.built_in = Some(built_in);
            }
            Decoration::Flat => self.flat = true,
            Decoration::NoPerspective => self.no_perspective = true,
            Decoration::Centroid => self.centroid = true,
            Decoration::Block => self.block = true,
            Decoration::BufferBlock => self.buffer_block = true,
            Decoration::DescriptorSet => {
                Self::exclusive(id, "descriptor set", &mut self.descriptor_set, arg_or("descriptor set")?)?
            }
            Decoration::Binding => {
                Self::exclusive(id, "binding", &mut self.binding, arg_or("binding")?)?
            }
            _ => {
                // intentionally partial; plenty of decorations carry no
                // meaning for code generation
            }
        }
        Ok(())
    }

    /// Merge a decoration group into this set.
    pub fn merge(&mut self, id: u32, src: &Decorations) -> Result<(), Error> {
        if src.location.is_some() {
            self.location = src.location;
        }
        if src.component.is_some() {
            self.component = src.component;
        }
        if src.built_in.is_some() {
            self.built_in = src.built_in;
        }
        if let Some(set) = src.descriptor_set {
            Self::exclusive(id, "descriptor set", &mut self.descriptor_set, set)?;
        }
        if let Some(binding) = src.binding {
            Self::exclusive(id, "binding", &mut self.binding, binding)?;
        }
        self.flat |= src.flat;
        self.no_perspective |= src.no_perspective;
        self.centroid |= src.centroid;
        self.block |= src.block;
        self.buffer_block |= src.buffer_block;
        Ok(())
    }

    fn exclusive(
        id: u32,
        field: &'static str,
        slot: &mut Option<u32>,
        value: u32,
    ) -> Result<(), Error> {
        match *slot {
            Some(previous) if previous != value => Err(Error::DecorationConflict {
                id,
                field,
                previous,
                conflicting: value,
            }),
            _ => {
                *slot = Some(value);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orthogonal_decorations_accumulate() {
        let mut d = Decorations::default();
        d.apply(1, Decoration::Location, Some(3)).unwrap();
        d.apply(1, Decoration::Flat, None).unwrap();
        d.apply(1, Decoration::Centroid, None).unwrap();
        assert_eq!(d.location, Some(3));
        assert!(d.flat && d.centroid && !d.no_perspective);
    }

    #[test]
    fn binding_conflict_is_detected() {
        let mut d = Decorations::default();
        d.apply(7, Decoration::Binding, Some(0)).unwrap();
        // re-decorating with the same value is fine
        d.apply(7, Decoration::Binding, Some(0)).unwrap();
        assert!(matches!(
            d.apply(7, Decoration::Binding, Some(1)),
            Err(Error::DecorationConflict {
                id: 7,
                field: "binding",
                previous: 0,
                conflicting: 1,
            })
        ));
    }

    #[test]
    fn group_merge_respects_exclusive_fields() {
        let mut d = Decorations::default();
        d.apply(2, Decoration::DescriptorSet, Some(1)).unwrap();

        let mut group = Decorations::default();
        group.apply(9, Decoration::DescriptorSet, Some(2)).unwrap();
        group.apply(9, Decoration::NoPerspective, None).unwrap();

        assert!(matches!(
            d.merge(2, &group),
            Err(Error::DecorationConflict { field: "descriptor set", .. })
        ));
    }
}
