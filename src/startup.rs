use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::net::TcpListener;

use crate::flows::AuthService;
use crate::middleware::JwtMiddleware;
use crate::routes::{
    forgot_password, get_current_user, health_check, login, logout, refresh, register,
    resend_verification, reset_password, verify_email,
};

pub fn run(listener: TcpListener, service: AuthService) -> Result<Server, std::io::Error> {
    let jwt_config = service.jwt.clone();
    let service = web::Data::new(service);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(service.clone())
            // Public routes (no authentication required)
            .route("/health_check", web::get().to(health_check))
            .route("/auth/register", web::post().to(register))
            .route("/auth/login", web::post().to(login))
            .route("/auth/refresh", web::post().to(refresh))
            .route("/auth/logout", web::post().to(logout))
            .route("/auth/forgot-password", web::post().to(forgot_password))
            .route("/auth/reset-password", web::post().to(reset_password))
            .route("/auth/verify-email/{token}", web::get().to(verify_email))
            .route(
                "/auth/resend-verification",
                web::post().to(resend_verification),
            )
            // Protected routes (require JWT authentication)
            .service(
                web::scope("/auth")
                    .wrap(JwtMiddleware::new(jwt_config.clone()))
                    .route("/me", web::get().to(get_current_user)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
