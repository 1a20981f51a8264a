//! Notes REST API: a thin mapping from HTTP onto the note store.

use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;
use std::sync::Arc;

use crate::db::{Database, ErrorKind, NoteError, NoteResult};
use crate::models::{CreateNoteRequest, NewNote, NoteCount, UpdateNoteRequest};
use crate::AppState;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/api/notes")
            .route(web::get().to(list_notes))
            .route(web::post().to(create_note)),
    )
    .service(web::resource("/api/notes/search").route(web::get().to(search_notes)))
    .service(web::resource("/api/notes/count").route(web::get().to(count_notes)))
    .service(
        web::resource("/api/notes/{id}")
            .route(web::get().to(get_note))
            .route(web::put().to(update_note))
            .route(web::delete().to(delete_note)),
    );
}

/// Rejection for bodies that are not valid JSON for the endpoint
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        log::debug!("Rejected request body: {}", err);
        actix_web::error::InternalError::from_response(
            err,
            HttpResponse::BadRequest().json(serde_json::json!({
                "error": "Invalid request body"
            })),
        )
        .into()
    })
}

/// Run a store call on the blocking pool and map failures to responses
async fn with_store<F, T>(state: &web::Data<AppState>, f: F) -> Result<T, HttpResponse>
where
    F: FnOnce(&Database) -> NoteResult<T> + Send + 'static,
    T: Send + 'static,
{
    let db = Arc::clone(&state.db);
    match web::block(move || f(db.as_ref())).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(error_response(&e)),
        Err(e) => {
            log::error!("Note store task failed: {}", e);
            Err(HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Internal server error"
            })))
        }
    }
}

fn error_response(err: &NoteError) -> HttpResponse {
    match err.kind() {
        ErrorKind::NotFound => HttpResponse::NotFound().json(serde_json::json!({
            "error": "Note not found"
        })),
        ErrorKind::InvalidInput => HttpResponse::BadRequest().json(serde_json::json!({
            "error": err.to_string()
        })),
        ErrorKind::Storage => {
            log::error!("Note store error: {}", err);
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Internal server error"
            }))
        }
    }
}

fn parse_note_id(raw: &str) -> Result<i64, NoteError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| NoteError::InvalidInput("Invalid note ID".to_string()))
}

async fn list_notes(state: web::Data<AppState>) -> impl Responder {
    match with_store(&state, |db| db.list_notes()).await {
        Ok(notes) => HttpResponse::Ok().json(notes),
        Err(resp) => resp,
    }
}

async fn create_note(
    state: web::Data<AppState>,
    body: web::Json<CreateNoteRequest>,
) -> impl Responder {
    let new = NewNote::from(body.into_inner());
    match with_store(&state, move |db| db.create_note(&new)).await {
        Ok(note) => HttpResponse::Created().json(note),
        Err(resp) => resp,
    }
}

async fn get_note(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let id = match parse_note_id(&path) {
        Ok(id) => id,
        Err(e) => return error_response(&e),
    };
    match with_store(&state, move |db| db.get_note(id)).await {
        Ok(note) => HttpResponse::Ok().json(note),
        Err(resp) => resp,
    }
}

async fn update_note(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<UpdateNoteRequest>,
) -> impl Responder {
    let id = match parse_note_id(&path) {
        Ok(id) => id,
        Err(e) => return error_response(&e),
    };
    let changes = body.into_inner();
    match with_store(&state, move |db| db.update_note(id, &changes)).await {
        Ok(note) => HttpResponse::Ok().json(note),
        Err(resp) => resp,
    }
}

async fn delete_note(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let id = match parse_note_id(&path) {
        Ok(id) => id,
        Err(e) => return error_response(&e),
    };
    match with_store(&state, move |db| db.delete_note(id)).await {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(resp) => resp,
    }
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
}

async fn search_notes(state: web::Data<AppState>, query: web::Query<SearchQuery>) -> impl Responder {
    let term = query.into_inner().q;
    match with_store(&state, move |db| db.search_notes(&term)).await {
        Ok(notes) => HttpResponse::Ok().json(notes),
        Err(resp) => resp,
    }
}

async fn count_notes(state: web::Data<AppState>) -> impl Responder {
    match with_store(&state, |db| db.count_notes()).await {
        Ok(count) => HttpResponse::Ok().json(NoteCount { count }),
        Err(resp) => resp,
    }
}
