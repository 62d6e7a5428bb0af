//! Reads the uniform struct a WGSL stage actually declares, so a program's
//! `UniformLayout` can be checked against the compiled source.

use naga::{AddressSpace, ScalarKind, TypeInner, VectorSize};

use crate::uniforms::{UniformKind, UniformLayout};

/// One leaf member of the uniform struct, named by its dotted path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredUniform {
    pub name: String,
    /// `None` for types no setter can write.
    pub kind: Option<UniformKind>,
    pub offset: u32,
}

pub fn parse(source: &str) -> Result<naga::Module, String> {
    naga::front::wgsl::parse_str(source).map_err(|err| err.emit_to_string(source))
}

/// Members of the uniform bound at group 0, binding 0 with absolute offsets,
/// or `None` when the stage does not bind it.
pub fn declared_uniforms(module: &naga::Module) -> Option<Vec<DeclaredUniform>> {
    let (_, global) = module.global_variables.iter().find(|(_, var)| {
        var.space == AddressSpace::Uniform
            && var
                .binding
                .as_ref()
                .is_some_and(|binding| binding.group == 0 && binding.binding == 0)
    })?;

    let mut declared = Vec::new();
    flatten(module, global.ty, "", 0, &mut declared);
    Some(declared)
}

fn flatten(
    module: &naga::Module,
    ty: naga::Handle<naga::Type>,
    path: &str,
    base: u32,
    out: &mut Vec<DeclaredUniform>,
) {
    match &module.types[ty].inner {
        TypeInner::Struct { members, .. } => {
            for member in members {
                let name = member.name.as_deref().unwrap_or("_");
                let member_path = match path {
                    "" => name.to_string(),
                    _ => format!("{path}.{name}"),
                };
                flatten(module, member.ty, &member_path, base + member.offset, out);
            }
        }
        inner => out.push(DeclaredUniform {
            name: path.to_string(),
            kind: uniform_kind(inner),
            offset: base,
        }),
    }
}

fn uniform_kind(inner: &TypeInner) -> Option<UniformKind> {
    match *inner {
        TypeInner::Scalar(scalar) if scalar.width == 4 => match scalar.kind {
            ScalarKind::Sint => Some(UniformKind::Int),
            ScalarKind::Float => Some(UniformKind::Float),
            _ => None,
        },
        TypeInner::Vector {
            size: VectorSize::Tri,
            scalar,
        } if scalar.kind == ScalarKind::Float && scalar.width == 4 => Some(UniformKind::Vec3),
        TypeInner::Matrix {
            columns: VectorSize::Quad,
            rows: VectorSize::Quad,
            scalar,
        } if scalar.width == 4 => Some(UniformKind::Mat4),
        _ => None,
    }
}

/// Every layout field must be declared with the same type and offset, and the
/// shader may not declare members the layout never writes.
pub fn check_layout(layout: &UniformLayout, declared: &[DeclaredUniform]) -> Result<(), String> {
    for field in layout.fields() {
        let Some(member) = declared.iter().find(|member| member.name == field.name) else {
            return Err(format!("`{}` is not declared", field.name));
        };
        if member.kind != Some(field.kind) {
            return Err(format!(
                "`{}` is declared as {:?}, expected {:?}",
                field.name, member.kind, field.kind
            ));
        }
        if member.offset != field.offset {
            return Err(format!(
                "`{}` sits at offset {}, expected {}",
                field.name, member.offset, field.offset
            ));
        }
    }

    match declared.iter().find(|member| !layout.contains(&member.name)) {
        Some(extra) => Err(format!("`{}` is declared but never written", extra.name)),
        None => Ok(()),
    }
}
