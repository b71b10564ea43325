use crate::connection::ws_index;
use actix_web::{web, Responder};

pub fn root(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(web::resource("/ws").route(web::get().to(ws_index)))
            .service(web::resource("/").route(web::get().to(hello))),
    );
}

async fn hello() -> impl Responder {
    "hello"
}
