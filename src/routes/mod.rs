use actix_web::web;

pub mod auth;
pub mod backend_health;
pub mod devices;
pub mod health_data;
pub mod profile;
pub mod registration;
pub mod stats;
pub mod websocket;

use crate::middleware::auth::AuthMiddleware;

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    // Public routes
    cfg.service(backend_health::root)
        .service(backend_health::backend_health)
        .service(registration::register)
        .service(auth::login)
        .service(auth::forgot_password_route)
        .service(auth::verify_otp_route)
        .service(auth::reset_password_route)
        .service(devices::device_telemetry);

    // WebSocket route (authentication handled in route)
    cfg.service(websocket::ws_route);

    cfg.service(
        web::scope("/api")
            .wrap(AuthMiddleware)
            .service(profile::get_profile)
            .service(profile::update_profile)
            .service(profile::delete_profile)
            .service(profile::profile_stats)
            .service(profile::clear_conversation_cache)
            .service(health_data::save_vitals)
            .service(health_data::list_vitals)
            .service(health_data::latest_vitals)
            .service(health_data::add_condition)
            .service(health_data::medical_history)
            .service(stats::system_stats)
            .service(devices::list_devices)
            .service(devices::link_device)
            .service(devices::unlink_device)
            .service(devices::device_info)
            .service(devices::link_current_device)
            .service(devices::unlink_current_device)
            .service(devices::device_data)
            .service(devices::latest_device_data)
            .service(devices::device_data_24h),
    );
}
