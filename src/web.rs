//! The station's single HTTP endpoint.
//!
//! GET / triggers one synchronous read-and-respond cycle against the sensors
//! and answers `200 application/json` with the flat readings document. The
//! station state sits behind a mutex, so requests serialize against the
//! blocking sensor reads. There are no other routes and no error statuses:
//! sensor failures are logged and the document is served regardless.

use crate::station::Station;
use actix_web::{web, App, HttpResponse, HttpServer};
use flourish_station::light::LightChannels;
use flourish_station::transport::Transport;
use log::{error, info};
use std::sync::Mutex;
use std::thread;

struct AppState<T: Transport, C: LightChannels> {
    station: Mutex<Station<T, C>>,
}

async fn root<T, C>(data: web::Data<AppState<T, C>>) -> HttpResponse
where
    T: Transport + Send + 'static,
    C: LightChannels + Send + 'static,
{
    info!("Root request received");
    let document = web::block(move || {
        let mut station = match data.station.lock() {
            Ok(station) => station,
            Err(poisoned) => poisoned.into_inner(),
        };
        station.read_document()
    })
    .await
    .unwrap_or_else(|err| {
        error!("Sensor read task failed: {err}");
        Default::default()
    });
    HttpResponse::Ok().json(document)
}

/// Binds the endpoint and serves until the process is terminated.
///
/// Alongside the request loop, a supervisor thread runs the station's link
/// check on its configured interval, so a dead serial link is reopened even
/// while no client is polling the endpoint.
pub fn serve<T, C>(bind: &str, station: Station<T, C>) -> std::io::Result<()>
where
    T: Transport + Send + 'static,
    C: LightChannels + Send + 'static,
{
    let check_interval = station.check_interval();
    let state = web::Data::new(AppState {
        station: Mutex::new(station),
    });

    let supervisor_state = state.clone();
    thread::Builder::new()
        .name("link-supervisor".into())
        .spawn(move || loop {
            thread::sleep(check_interval);
            let mut station = match supervisor_state.station.lock() {
                Ok(station) => station,
                Err(poisoned) => poisoned.into_inner(),
            };
            station.check_link();
        })?;

    info!("Serving sensor readings on http://{bind}/");
    actix_web::rt::System::new().block_on(
        HttpServer::new(move || {
            App::new()
                .app_data(state.clone())
                .route("/", web::get().to(root::<T, C>))
        })
        // One worker: the sensors admit a single reader, more workers would
        // only queue on the mutex.
        .workers(1)
        .bind(bind)?
        .run(),
    )
}
