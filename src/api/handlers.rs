//! Read-only query handlers: thin request/response formatting over the
//! row store. No migration logic lives here.

use actix_web::{web, HttpResponse, Responder};
use serde_json::{json, Value};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::error;

use crate::content::schema::ContentTypeDescriptor;

pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

pub async fn list_content(
    pool: web::Data<SqlitePool>,
    path: web::Path<String>,
) -> impl Responder {
    let kind = path.into_inner();
    let Some(desc) = ContentTypeDescriptor::by_key(&kind) else {
        return HttpResponse::NotFound().json(json!({ "error": "unknown content type" }));
    };
    let sql = format!(
        "SELECT {} FROM {} ORDER BY created_at DESC",
        select_columns(desc),
        desc.table
    );
    match sqlx::query(&sql).fetch_all(pool.get_ref()).await {
        Ok(rows) => {
            let items: Vec<Value> = rows.iter().map(|r| row_to_json(r, desc)).collect();
            HttpResponse::Ok().json(json!({ "count": items.len(), "items": items }))
        }
        Err(err) => {
            error!(kind = desc.key, error = %err, "list query failed");
            HttpResponse::InternalServerError().json(json!({ "error": "query failed" }))
        }
    }
}

pub async fn get_by_slug(
    pool: web::Data<SqlitePool>,
    path: web::Path<(String, String)>,
) -> impl Responder {
    let (kind, slug) = path.into_inner();
    let Some(desc) = ContentTypeDescriptor::by_key(&kind) else {
        return HttpResponse::NotFound().json(json!({ "error": "unknown content type" }));
    };
    let sql = format!(
        "SELECT {} FROM {} WHERE slug = ?1",
        select_columns(desc),
        desc.table
    );
    match sqlx::query(&sql).bind(&slug).fetch_optional(pool.get_ref()).await {
        Ok(Some(row)) => HttpResponse::Ok().json(row_to_json(&row, desc)),
        Ok(None) => HttpResponse::NotFound().json(json!({ "error": "not found" })),
        Err(err) => {
            error!(kind = desc.key, slug = %slug, error = %err, "slug query failed");
            HttpResponse::InternalServerError().json(json!({ "error": "query failed" }))
        }
    }
}

fn select_columns(desc: &ContentTypeDescriptor) -> String {
    let mut columns = String::from(
        "id, slug, status, kind, title, content, featured_image, featured_images, \
         created_at, modified_at, updated_at",
    );
    if let Some(extra) = desc.extra {
        columns.push_str(", ");
        columns.push_str(extra.column);
    }
    columns
}

fn row_to_json(row: &SqliteRow, desc: &ContentTypeDescriptor) -> Value {
    let featured_images = row
        .try_get::<Option<String>, _>("featured_images")
        .ok()
        .flatten()
        .and_then(|raw| serde_json::from_str::<Value>(&raw).ok())
        .unwrap_or(Value::Null);
    let mut out = json!({
        "id": row.try_get::<i64, _>("id").unwrap_or_default(),
        "slug": row.try_get::<String, _>("slug").unwrap_or_default(),
        "status": row.try_get::<String, _>("status").unwrap_or_default(),
        "type": row.try_get::<String, _>("kind").unwrap_or_default(),
        "title": row.try_get::<String, _>("title").unwrap_or_default(),
        "content": row.try_get::<Option<String>, _>("content").ok().flatten(),
        "featuredImage": row.try_get::<Option<String>, _>("featured_image").ok().flatten(),
        "featuredImages": featured_images,
        "created": row.try_get::<String, _>("created_at").unwrap_or_default(),
        "modified": row.try_get::<String, _>("modified_at").unwrap_or_default(),
        "updatedAt": row.try_get::<String, _>("updated_at").unwrap_or_default(),
    });
    if let Some(extra) = desc.extra {
        out[extra.column] = row
            .try_get::<Option<String>, _>(extra.column)
            .ok()
            .flatten()
            .map(Value::String)
            .unwrap_or(Value::Null);
    }
    out
}
