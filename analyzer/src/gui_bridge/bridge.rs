use crate::generator::profile::{render_frames, GeneratorConfig};
use crate::gui_bridge::model::AnalysisModel;
use crate::workflow::runner::Runner;
use anyhow::Result;
use serde_json::json;
use std::{
    net::SocketAddr,
    sync::{Arc, RwLock},
    thread,
};
use tokio::runtime::Builder;
use warp::{http::StatusCode, Filter};

#[derive(Debug)]
struct WarpError;

impl warp::reject::Reject for WarpError {}

type SharedModel = Arc<RwLock<AnalysisModel>>;

fn store_model(state: &SharedModel, model: AnalysisModel) {
    let mut guard = state.write().unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = model;
}

/// Holds the latest analysis and serves it over HTTP to external plotting tools.
pub struct GuiBridge {
    state: SharedModel,
    runner: Arc<Runner>,
}

impl GuiBridge {
    pub fn new(runner: Arc<Runner>) -> Self {
        Self {
            state: Arc::new(RwLock::new(AnalysisModel::default())),
            runner,
        }
    }

    /// Starts the HTTP endpoint on a background thread.
    pub fn serve(&self, address: SocketAddr) {
        let state_for_filter = self.state.clone();
        let state_filter = warp::any().map(move || state_for_filter.clone());
        let runner = self.runner.clone();
        let runner_filter = warp::any().map(move || runner.clone());

        let get_route = warp::path("analysis")
            .and(warp::get())
            .and(state_filter.clone())
            .map(|state: SharedModel| {
                let guard = state.read().unwrap_or_else(|poisoned| poisoned.into_inner());
                warp::reply::json(&*guard)
            });

        let synthetic_route = warp::path("analyze-synthetic")
            .and(warp::post())
            .and(warp::body::json())
            .and(state_filter)
            .and(runner_filter)
            .and_then(
                |config: GeneratorConfig, state: SharedModel, runner: Arc<Runner>| async move {
                    match render_frames(&config).and_then(|frames| runner.execute(&frames)) {
                        Ok(result) => {
                            let model = AnalysisModel::from_result(&result);
                            let trajectories = model.trajectories.len();
                            store_model(&state, model);
                            if let Some(name) = config.scenario.as_ref() {
                                log::info!("[bridge] scenario {} -> trajectories {}", name, trajectories);
                            }
                            Ok::<_, warp::Rejection>(warp::reply::with_status(
                                warp::reply::json(&json!({
                                    "status": "ok",
                                    "trajectories": trajectories,
                                    "description": config.description.clone().unwrap_or_default()
                                })),
                                StatusCode::OK,
                            ))
                        }
                        Err(err) => {
                            log::error!("[bridge] analyze-synthetic error: {:#}", err);
                            Err(warp::reject::custom(WarpError))
                        }
                    }
                },
            );

        thread::spawn(move || {
            let routes = get_route.or(synthetic_route);
            match Builder::new_current_thread().enable_all().build() {
                Ok(runtime) => runtime.block_on(async move {
                    warp::serve(routes).run(address).await;
                }),
                Err(err) => log::error!("[bridge] failed to build runtime: {}", err),
            }
        });
        log::info!("[bridge] serving analysis on http://{}/analysis", address);
    }

    pub fn publish(&self, model: &AnalysisModel) -> Result<()> {
        println!(
            "[GUI] trajectories: {}, msd points: {}",
            model.trajectories.len(),
            model.msd.len()
        );
        store_model(&self.state, model.clone());
        Ok(())
    }

    pub fn publish_status(&self, message: &str) {
        println!("[GUI] {}", message);
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> AnalysisModel {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}
