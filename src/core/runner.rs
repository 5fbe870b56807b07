//! Drives the resource handlers the way a plan/apply cycle would.

use crate::core::provider::{Provider, ProviderContext, ProviderError};
use crate::resources::resource::Resource;
use crate::schema::data::{InstanceState, ResourceData};
use crate::schema::diagnostics::{Diagnostic, Diagnostics};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Update,
    NoOp,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeChange {
    pub name: String,
    pub before: Value,
    pub after: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plan {
    pub action: Action,
    pub changes: Vec<AttributeChange>,
    #[serde(skip_serializing_if = "Diagnostics::is_empty")]
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplyResult {
    /// State to record; `None` when there is nothing left to track.
    pub state: Option<InstanceState>,
    #[serde(skip_serializing_if = "Diagnostics::is_empty")]
    pub diagnostics: Diagnostics,
}

impl From<ProviderError> for Diagnostics {
    fn from(error: ProviderError) -> Self {
        Diagnostic::error(error.to_string()).into()
    }
}

pub struct Runner {
    provider: Provider,
    ctx: ProviderContext,
}

impl Runner {
    pub fn new(provider: Provider, ctx: ProviderContext) -> Self {
        Self { provider, ctx }
    }

    pub fn provider(&self) -> &Provider {
        &self.provider
    }

    fn resource(&self, resource_type: &str) -> Result<Arc<dyn Resource>, Diagnostics> {
        Ok(self.provider.resource(resource_type)?)
    }

    /// Schema-check a configuration without touching Discord.
    pub fn validate(
        &self,
        resource_type: &str,
        config: &Map<String, Value>,
    ) -> Result<Diagnostics, Diagnostics> {
        let resource = self.resource(resource_type)?;
        let diags = resource.schema().validate(config);
        if diags.has_error() {
            Err(diags)
        } else {
            Ok(diags)
        }
    }

    pub fn plan(
        &self,
        resource_type: &str,
        config: &Map<String, Value>,
        prior: Option<&InstanceState>,
    ) -> Result<Plan, Diagnostics> {
        let diagnostics = self.validate(resource_type, config)?;
        let resource = self.resource(resource_type)?;
        let d = ResourceData::new(resource.schema(), prior.cloned(), Some(config));

        let changes: Vec<AttributeChange> = d
            .changed_attributes()
            .into_iter()
            .map(|name| AttributeChange {
                before: d.prior_value(&name).cloned().unwrap_or(Value::Null),
                after: d.get(&name),
                name,
            })
            .collect();

        let action = match prior {
            None => Action::Create,
            Some(_) if changes.is_empty() => Action::NoOp,
            Some(_) => Action::Update,
        };

        Ok(Plan {
            action,
            changes,
            diagnostics,
        })
    }

    /// Create or update towards `config`.
    ///
    /// `Err` means nothing was attempted. Handler failures come back as error
    /// diagnostics next to the state that should be recorded: the new guild id
    /// for a create that failed halfway, the prior state for a failed update.
    pub async fn apply(
        &self,
        resource_type: &str,
        config: &Map<String, Value>,
        prior: Option<InstanceState>,
    ) -> Result<ApplyResult, Diagnostics> {
        let plan = self.plan(resource_type, config, prior.as_ref())?;
        let resource = self.resource(resource_type)?;
        let mut d = ResourceData::new(resource.schema(), prior.clone(), Some(config));

        let result = match plan.action {
            Action::NoOp => {
                debug!("{}: no changes", resource_type);
                return Ok(ApplyResult {
                    state: prior,
                    diagnostics: plan.diagnostics,
                });
            }
            Action::Create => {
                info!("{}: creating", resource_type);
                resource.create(&self.ctx, &mut d).await
            }
            Action::Update => {
                info!(
                    "{} {}: updating {} attribute(s)",
                    resource_type,
                    d.id(),
                    plan.changes.len()
                );
                resource.update(&self.ctx, &mut d).await
            }
        };

        let mut diagnostics = plan.diagnostics;
        let state = match result {
            Ok(()) => d.state(),
            Err(e) => {
                diagnostics.push(e.into());
                match plan.action {
                    Action::Create if !d.id().is_empty() => Some(InstanceState::new(d.id())),
                    _ => prior,
                }
            }
        };

        Ok(ApplyResult { state, diagnostics })
    }

    /// Reconcile remote state into `prior`. `None` means the resource is gone.
    pub async fn refresh(
        &self,
        resource_type: &str,
        prior: InstanceState,
    ) -> Result<Option<InstanceState>, Diagnostics> {
        let resource = self.resource(resource_type)?;
        let mut d = ResourceData::new(resource.schema(), Some(prior), None);
        resource
            .read(&self.ctx, &mut d)
            .await
            .map_err(|e| Diagnostics::from(Diagnostic::from(e)))?;
        Ok(d.state())
    }

    pub async fn destroy(
        &self,
        resource_type: &str,
        prior: InstanceState,
    ) -> Result<(), Diagnostics> {
        let resource = self.resource(resource_type)?;
        let mut d = ResourceData::new(resource.schema(), Some(prior), None);
        resource
            .delete(&self.ctx, &mut d)
            .await
            .map_err(|e| Diagnostics::from(Diagnostic::from(e)))?;
        info!("{}: destroyed", resource_type);
        Ok(())
    }

    /// Import by id, then read the remaining attributes.
    pub async fn import(&self, resource_type: &str, id: &str) -> Result<InstanceState, Diagnostics> {
        let resource = self.resource(resource_type)?;
        let mut d = resource
            .import(&self.ctx, id)
            .await
            .map_err(|e| Diagnostics::from(Diagnostic::from(e)))?;
        resource
            .read(&self.ctx, &mut d)
            .await
            .map_err(|e| Diagnostics::from(Diagnostic::from(e)))?;

        d.state().ok_or_else(|| {
            Diagnostics::from(Diagnostic::error(format!(
                "Cannot import non-existent remote object: {} with id {}",
                resource_type, id
            )))
        })
    }
}

/// Split `type.name` into its parts.
pub fn parse_address(address: &str) -> Result<(&str, &str), Diagnostics> {
    match address.split_once('.') {
        Some((resource_type, name)) if !resource_type.is_empty() && !name.is_empty() => {
            Ok((resource_type, name))
        }
        _ => Err(Diagnostic::error(format!(
            "Invalid resource address \"{}\", expected <type>.<name>",
            address
        ))
        .into()),
    }
}
