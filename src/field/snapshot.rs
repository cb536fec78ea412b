use serde::{Deserialize, Serialize};

use crate::{error::Result, expr::Expression, grid::Dimensions};

use super::{Field, FieldObject, MetaObject, Predefined, Source};

/// Serializable description of a [`Field`]: its resolution and the members with
/// their variable values. Sampled grids are not stored; they are recomputed on load.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldSnapshot {
    pub dimensions: Dimensions,
    pub meta_objects: Vec<MetaObjectSnapshot>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum MetaObjectSnapshot {
    Expression {
        expression: String,
        variables: Vec<(String, f64)>,
    },
    Predefined(Predefined),
}

/// User variables that survive a JSON round trip. NaN and infinities would be
/// written as `null` and then fail to load, so they are left out and come back
/// with the default value.
fn finite_variables(member: &MetaObject) -> Vec<(String, f64)> {
    member
        .user_variables()
        .into_iter()
        .filter(|(name, value)| {
            let keep = value.is_finite();
            if !keep {
                log::warn!("meta-object {}: not saving `{name}` = {value}", member.id());
            }
            keep
        })
        .collect()
}

impl Field {
    /// Describes the field for saving. Non-finite variable values are dropped.
    pub fn snapshot(&self) -> FieldSnapshot {
        let meta_objects = self
            .meta_objects()
            .iter()
            .map(|member| match member.source() {
                Source::Expression(expression) => MetaObjectSnapshot::Expression {
                    expression: expression.source().to_string(),
                    variables: finite_variables(member),
                },
                Source::Predefined(predefined) => MetaObjectSnapshot::Predefined(*predefined),
            })
            .collect();

        FieldSnapshot {
            dimensions: self.dimensions(),
            meta_objects,
        }
    }

    /// Rebuilds a field from `snapshot`.
    ///
    /// Expressions that no longer compile are skipped with a warning; variable
    /// names the expression does not use are ignored. Only invalid dimensions
    /// fail the whole load.
    pub fn from_snapshot(snapshot: &FieldSnapshot) -> Result<Self> {
        let mut field = Field::new(snapshot.dimensions)?;

        for (index, entry) in snapshot.meta_objects.iter().enumerate() {
            let source = match entry {
                MetaObjectSnapshot::Expression {
                    expression,
                    variables,
                } => {
                    let mut compiled = match Expression::compile(expression) {
                        Ok(compiled) => compiled,
                        Err(e) => {
                            log::warn!("skipping meta-object {index} `{expression}`: {e}");
                            continue;
                        }
                    };
                    let set = compiled
                        .variables_mut()
                        .set_values(variables.iter().map(|(name, value)| (name.as_str(), *value)));
                    if set < variables.len() {
                        log::debug!(
                            "meta-object {index}: {} of {} stored variables unused",
                            variables.len() - set,
                            variables.len()
                        );
                    }
                    Source::Expression(compiled)
                }
                MetaObjectSnapshot::Predefined(predefined) => Source::Predefined(*predefined),
            };
            field.add_meta_object(source)?;
        }

        Ok(field)
    }
}
