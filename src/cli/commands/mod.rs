use anyhow::{bail, Result};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};

use super::{Cli, Commands};
use crate::access::Actor;
use crate::api::{ApiResponse, CreateMovementRequest, MovementApi, TransportDetails};
use crate::config::MoveItRightConfig;
use crate::error::ApiError;
use crate::observability::api_metrics;

pub mod session;

pub use session::Session;

/// Run one command and print its envelope. Returns whether it succeeded.
///
/// The envelope is printed only after the store has been persisted, so a
/// success answer always describes saved state.
pub async fn execute(cli: Cli, config: MoveItRightConfig) -> Result<bool> {
    if let Commands::ShowConfig = cli.command {
        print!("{}", config.to_toml()?);
        return Ok(true);
    }

    let Some(user) = cli.user.as_deref() else {
        bail!("--user is required for '{}'", cli.command.name());
    };

    let session = match Session::open(&config).await {
        Ok(session) => session,
        Err(err) => return emit(&store_failure("Failed to open store", &err)),
    };
    let api = MovementApi::from_config(&config, session.store())?;

    let response = match api.identity().resolve_actor(user).await {
        Ok(actor) => {
            info!(user = %actor.user(), command = cli.command.name(), "Running command");
            dispatch(&api, &actor, cli.command).await?
        }
        Err(err) => ApiResponse::failure(err),
    };

    let response = match session.close().await {
        Ok(()) => response,
        Err(err) => store_failure("Changes were not saved", &err),
    };

    if config.observability.enable_metrics {
        api_metrics().log_stats();
    }
    emit(&response)
}

fn store_failure(context: &str, err: &anyhow::Error) -> ApiResponse<Value> {
    api_metrics().record_error();
    error!(error = %format!("{err:#}"), "{context}");
    ApiResponse::failure(ApiError::InternalFailure(format!("{context}: {err:#}")))
}

async fn dispatch(api: &MovementApi, actor: &Actor, command: Commands) -> Result<ApiResponse<Value>> {
    match command {
        Commands::Movements => render(api.get_asset_movements_with_items(actor).await),
        Commands::Actions { record, state } => {
            render(api.get_workflow_actions_for_user(actor, &record, state).await)
        }
        Commands::Create {
            asset,
            from_location,
            to_location,
            expected_date,
            remarks,
        } => render(
            api.create_asset_movement(
                actor,
                CreateMovementRequest {
                    asset,
                    from_location,
                    to_location,
                    expected_date,
                    remarks,
                },
            )
            .await,
        ),
        Commands::Apply {
            record,
            action,
            expected_state,
        } => render(
            api.apply_workflow_action(actor, &record, &action, expected_state)
                .await,
        ),
        Commands::Dashboard => render(api.get_user_dashboard_data(actor).await),
        Commands::Locations => render(api.get_locations(actor).await),
        Commands::Assets { location, category } => {
            render(api.get_assets_by_location(actor, &location, category.as_deref()).await)
        }
        Commands::Categories => render(api.get_asset_categories(actor).await),
        Commands::Search {
            term,
            location,
            category,
        } => render(
            api.search_assets(actor, &term, location.as_deref(), category.as_deref())
                .await,
        ),
        Commands::RejectReason { record, reason } => {
            render(api.save_rejection_reason(actor, &record, &reason).await)
        }
        Commands::Whoami => render(api.get_current_user_info(actor).await),
        Commands::Transporters => render(api.get_transporters(actor).await),
        Commands::AssignTransport {
            record,
            vehicle_type,
            transporter,
            driver,
        } => render(
            api.assign_transport_details(
                actor,
                &record,
                TransportDetails {
                    vehicle_type,
                    transporter,
                    driver,
                },
            )
            .await,
        ),
        // Answered before a session is opened
        Commands::ShowConfig => Ok(ApiResponse::success(Value::Null)),
    }
}

fn render<T: Serialize>(response: ApiResponse<T>) -> Result<ApiResponse<Value>> {
    let ApiResponse {
        status,
        data,
        message,
        error,
    } = response;
    Ok(ApiResponse {
        status,
        data: data.map(serde_json::to_value).transpose()?,
        message,
        error,
    })
}

fn emit(response: &ApiResponse<Value>) -> Result<bool> {
    println!("{}", serde_json::to_string_pretty(response)?);
    Ok(response.is_success())
}
