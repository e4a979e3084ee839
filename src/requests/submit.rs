// One step request end to end: ticket, abortable call, commit

use serde_json::Value;
use tracing::{debug, info};

use super::abort::{run_abortable, AbortSignal};
use super::traits::{OnboardingApi, UpstreamRequestError};
use crate::domains::CloudProvider;
use crate::router::Router;
use crate::storage::KeyValueStore;
use crate::wizard::{OnboardingWizard, RequestResolution, StepCommit, WizardError};

/// Backend operation for one commit, with the provider already resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ApiCall {
    RegistryCredentials(CloudProvider),
    RegistrySettings(CloudProvider),
    RegistryConnection(CloudProvider),
    ProvisioningCredentials(CloudProvider),
    ProvisioningSettings(CloudProvider),
    OwnCluster,
}

fn api_call_for<S, R>(
    wizard: &OnboardingWizard<S, R>,
    commit: StepCommit,
) -> Result<ApiCall, WizardError>
where
    S: KeyValueStore,
    R: Router,
{
    let registry = || {
        wizard
            .registry()
            .selected_provider()
            .ok_or(WizardError::ProviderNotSelected { domain: "connected_registry" })
    };
    let provisioning = || {
        wizard
            .provisioning()
            .selected_provider()
            .ok_or(WizardError::ProviderNotSelected { domain: "provision_resources" })
    };

    Ok(match commit {
        StepCommit::RegistryCredentials => ApiCall::RegistryCredentials(registry()?),
        StepCommit::RegistrySettings => ApiCall::RegistrySettings(registry()?),
        StepCommit::RegistryConnection => ApiCall::RegistryConnection(registry()?),
        StepCommit::ProvisioningCredentials => ApiCall::ProvisioningCredentials(provisioning()?),
        StepCommit::ProvisioningSettings => ApiCall::ProvisioningSettings(provisioning()?),
        StepCommit::OwnCluster => ApiCall::OwnCluster,
    })
}

async fn call_api<A: OnboardingApi + ?Sized>(
    api: &A,
    project_id: u64,
    call: ApiCall,
    form: Value,
) -> Result<Value, UpstreamRequestError> {
    match call {
        ApiCall::RegistryCredentials(provider) => {
            api.submit_registry_credentials(project_id, provider, form).await
        }
        ApiCall::RegistrySettings(provider) => {
            api.submit_registry_settings(project_id, provider, form).await
        }
        ApiCall::RegistryConnection(provider) => {
            api.test_registry_connection(project_id, provider).await
        }
        ApiCall::ProvisioningCredentials(provider) => {
            api.submit_provisioning_credentials(project_id, provider, form)
                .await
        }
        ApiCall::ProvisioningSettings(provider) => {
            api.provision_resources(project_id, provider, form).await
        }
        ApiCall::OwnCluster => api.connect_own_cluster(project_id, form).await,
    }
}

/// Submit the current step's form to the backend and feed the outcome back
/// into the wizard.
///
/// The cursor must already sit on the step `commit` belongs to; otherwise
/// nothing is sent. The call runs under `signal`; aborting it (e.g. on
/// unmount) abandons the ticket so a late response can never move the cursor.
pub async fn submit_step<S, R, A>(
    wizard: &mut OnboardingWizard<S, R>,
    api: &A,
    commit: StepCommit,
    form: Value,
    signal: AbortSignal,
) -> Result<RequestResolution, WizardError>
where
    S: KeyValueStore,
    R: Router,
    A: OnboardingApi + ?Sized,
{
    wizard.expect_step(commit.step())?;
    let call = api_call_for(wizard, commit)?;
    let ticket = wizard.begin_request()?;
    let project_id = wizard.project_id();

    debug!(
        ticket = ticket.id(),
        step = %ticket.step(),
        commit = ?commit,
        "Submitting step request"
    );

    match run_abortable(signal, call_api(api, project_id, call, form)).await {
        Some(result) => wizard.complete_request(ticket, commit, result),
        None => {
            info!(ticket = ticket.id(), step = %ticket.step(), "Step request aborted");
            wizard.cancel_request();
            Ok(RequestResolution::Aborted)
        }
    }
}
