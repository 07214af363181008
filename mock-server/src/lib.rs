use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

/// Size of the `/large.json` body, above ureq's default read limit.
pub const LARGE_BODY_LEN: usize = 11 * 1024 * 1024;

/// Id and username of the member the credential belongs to.
pub const ME_ID: &str = "5f1a2b3c4d5e6f7a8b9c0d1e";
pub const ME_USERNAME: &str = "mockuser";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: String,
    pub name: String,
    pub desc: String,
    pub closed: bool,
    pub url: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: String,
    pub name: String,
    pub desc: String,
    pub id_board: String,
    pub id_list: Option<String>,
    pub closed: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: String,
    pub username: String,
    pub full_name: String,
}

#[derive(Deserialize)]
pub struct CreateBoard {
    pub name: String,
    #[serde(default)]
    pub desc: String,
}

#[derive(Deserialize)]
pub struct UpdateBoard {
    pub name: Option<String>,
    pub desc: Option<String>,
    pub closed: Option<bool>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCard {
    pub name: String,
    pub id_board: String,
    pub id_list: Option<String>,
    #[serde(default)]
    pub desc: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCard {
    pub name: Option<String>,
    pub desc: Option<String>,
    pub id_list: Option<String>,
    pub closed: Option<bool>,
}

#[derive(Debug)]
pub struct Store {
    boards: HashMap<String, Board>,
    cards: HashMap<String, Card>,
    me: Member,
}

impl Default for Store {
    fn default() -> Self {
        Self {
            boards: HashMap::new(),
            cards: HashMap::new(),
            me: Member {
                id: ME_ID.to_string(),
                username: ME_USERNAME.to_string(),
                full_name: "Mock User".to_string(),
            },
        }
    }
}

pub type Db = Arc<RwLock<Store>>;

/// Representation requested by the last path segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    Json,
    Xml,
}

/// Split `abc.json` into `("abc", Json)`. Unknown suffixes are not routed.
fn split_format(segment: &str) -> Result<(&str, Format), StatusCode> {
    if let Some(id) = segment.strip_suffix(".json") {
        Ok((id, Format::Json))
    } else if let Some(id) = segment.strip_suffix(".xml") {
        Ok((id, Format::Xml))
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}

/// Routes mirror the Trello API under its `/1` version prefix.
pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    let api = Router::new()
        .route("/boards.json", post(create_board))
        .route("/boards/{id}", get(get_board).put(update_board))
        .route("/boards/{id}/cards.json", get(board_cards))
        .route("/boards/{id}/members.json", get(board_members))
        .route("/cards.json", post(create_card))
        .route("/cards/{id}", get(get_card).put(update_card).delete(delete_card))
        .route("/members/{id}", get(get_member))
        .route("/members/{id}/boards.json", get(member_boards))
        .route("/uploads.json", post(upload))
        .route("/uploads.xml", post(upload))
        .route("/echo.json", any(echo_json))
        .route("/echo.xml", any(echo_xml))
        .route("/redirect.json", any(redirect))
        .route("/large.json", get(large))
        .route("/binary.json", get(binary))
        .with_state(db);
    Router::new().nest("/1", api)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn new_id() -> String {
    Uuid::new_v4().simple().to_string()[..24].to_string()
}

fn escape_xml(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn board_xml(board: &Board) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><board id="{}"><name>{}</name><desc>{}</desc><closed>{}</closed><url>{}</url></board>"#,
        escape_xml(&board.id),
        escape_xml(&board.name),
        escape_xml(&board.desc),
        board.closed,
        escape_xml(&board.url),
    )
}

fn xml_response(body: String) -> Response {
    ([(header::CONTENT_TYPE, "text/xml")], body).into_response()
}

async fn create_board(State(db): State<Db>, Json(input): Json<CreateBoard>) -> Json<Board> {
    let id = new_id();
    let board = Board {
        url: format!("https://trello.test/b/{id}"),
        id,
        name: input.name,
        desc: input.desc,
        closed: false,
    };
    db.write().await.boards.insert(board.id.clone(), board.clone());
    Json(board)
}

async fn get_board(
    State(db): State<Db>,
    Path(segment): Path<String>,
) -> Result<Response, StatusCode> {
    let (id, format) = split_format(&segment)?;
    let store = db.read().await;
    let board = store.boards.get(id).ok_or(StatusCode::NOT_FOUND)?;
    Ok(match format {
        Format::Json => Json(board.clone()).into_response(),
        Format::Xml => xml_response(board_xml(board)),
    })
}

async fn update_board(
    State(db): State<Db>,
    Path(segment): Path<String>,
    Json(input): Json<UpdateBoard>,
) -> Result<Json<Board>, StatusCode> {
    let (id, _) = split_format(&segment)?;
    let mut store = db.write().await;
    let board = store.boards.get_mut(id).ok_or(StatusCode::NOT_FOUND)?;
    if let Some(name) = input.name {
        board.name = name;
    }
    if let Some(desc) = input.desc {
        board.desc = desc;
    }
    if let Some(closed) = input.closed {
        board.closed = closed;
    }
    Ok(Json(board.clone()))
}

async fn board_cards(
    State(db): State<Db>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Card>>, StatusCode> {
    let store = db.read().await;
    if !store.boards.contains_key(&id) {
        return Err(StatusCode::NOT_FOUND);
    }
    let cards = store
        .cards
        .values()
        .filter(|c| c.id_board == id)
        .cloned()
        .collect();
    Ok(Json(cards))
}

async fn board_members(
    State(db): State<Db>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Member>>, StatusCode> {
    let store = db.read().await;
    if !store.boards.contains_key(&id) {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(vec![store.me.clone()]))
}

async fn create_card(
    State(db): State<Db>,
    Json(input): Json<CreateCard>,
) -> Result<Json<Card>, StatusCode> {
    let mut store = db.write().await;
    if !store.boards.contains_key(&input.id_board) {
        return Err(StatusCode::BAD_REQUEST);
    }
    let card = Card {
        id: new_id(),
        name: input.name,
        desc: input.desc,
        id_board: input.id_board,
        id_list: input.id_list,
        closed: false,
    };
    store.cards.insert(card.id.clone(), card.clone());
    Ok(Json(card))
}

async fn get_card(
    State(db): State<Db>,
    Path(segment): Path<String>,
) -> Result<Json<Card>, StatusCode> {
    let (id, _) = split_format(&segment)?;
    let store = db.read().await;
    store.cards.get(id).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn update_card(
    State(db): State<Db>,
    Path(segment): Path<String>,
    Json(input): Json<UpdateCard>,
) -> Result<Json<Card>, StatusCode> {
    let (id, _) = split_format(&segment)?;
    let mut store = db.write().await;
    let card = store.cards.get_mut(id).ok_or(StatusCode::NOT_FOUND)?;
    if let Some(name) = input.name {
        card.name = name;
    }
    if let Some(desc) = input.desc {
        card.desc = desc;
    }
    if let Some(id_list) = input.id_list {
        card.id_list = Some(id_list);
    }
    if let Some(closed) = input.closed {
        card.closed = closed;
    }
    Ok(Json(card.clone()))
}

/// Answers 200 with an empty body.
async fn delete_card(
    State(db): State<Db>,
    Path(segment): Path<String>,
) -> Result<StatusCode, StatusCode> {
    let (id, _) = split_format(&segment)?;
    let mut store = db.write().await;
    store.cards.remove(id).map(|_| StatusCode::OK).ok_or(StatusCode::NOT_FOUND)
}

/// `me` requires an `Authorization` header; explicit ids and usernames do not.
async fn get_member(
    State(db): State<Db>,
    Path(segment): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Member>, (StatusCode, &'static str)> {
    let (id, _) = split_format(&segment).map_err(|s| (s, ""))?;
    if id == "me" && !headers.contains_key(header::AUTHORIZATION) {
        return Err((StatusCode::UNAUTHORIZED, "unauthorized permission requested"));
    }
    let store = db.read().await;
    let me = &store.me;
    if id == "me" || id == me.id || id == me.username {
        Ok(Json(me.clone()))
    } else {
        Err((StatusCode::NOT_FOUND, "member not found"))
    }
}

async fn member_boards(
    State(db): State<Db>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Board>>, StatusCode> {
    let store = db.read().await;
    if id != "me" && id != store.me.id && id != store.me.username {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(store.boards.values().cloned().collect()))
}

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

async fn upload(headers: HeaderMap, body: String) -> (StatusCode, Json<serde_json::Value>) {
    let content_type = header_str(&headers, header::CONTENT_TYPE);
    (
        StatusCode::CREATED,
        Json(json!({"contentType": content_type, "bytes": body.len()})),
    )
}

/// Reports what the request carried.
async fn echo_json(method: Method, headers: HeaderMap, body: String) -> Json<serde_json::Value> {
    Json(json!({
        "method": method.as_str(),
        "contentType": header_str(&headers, header::CONTENT_TYPE),
        "authorization": header_str(&headers, header::AUTHORIZATION),
        "body": body,
    }))
}

async fn echo_xml(method: Method, headers: HeaderMap, body: String) -> Response {
    xml_response(format!(
        r#"<echo method="{}"><contentType>{}</contentType><authorization>{}</authorization><body>{}</body></echo>"#,
        method.as_str(),
        escape_xml(&header_str(&headers, header::CONTENT_TYPE)),
        escape_xml(&header_str(&headers, header::AUTHORIZATION)),
        escape_xml(&body),
    ))
}

/// Points back at the echo route; clients must not follow it.
async fn redirect() -> Response {
    (StatusCode::FOUND, [(header::LOCATION, "/1/echo.json")]).into_response()
}

async fn large() -> String {
    "x".repeat(LARGE_BODY_LEN)
}

/// A body that is not valid UTF-8.
async fn binary() -> Response {
    (
        [(header::CONTENT_TYPE, "application/octet-stream")],
        vec![0xffu8, 0xfe, 0x00, 0x01],
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_serializes_camel_case() {
        let card = Card {
            id: "c1".to_string(),
            name: "Test".to_string(),
            desc: String::new(),
            id_board: "b1".to_string(),
            id_list: None,
            closed: false,
        };
        let json = serde_json::to_value(&card).unwrap();
        assert_eq!(json["idBoard"], "b1");
        assert!(json["idList"].is_null());
    }

    #[test]
    fn split_format_recognizes_suffixes() {
        assert_eq!(split_format("b1.json").unwrap(), ("b1", Format::Json));
        assert_eq!(split_format("b1.xml").unwrap(), ("b1", Format::Xml));
        assert_eq!(split_format("b1").unwrap_err(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn new_ids_are_24_hex_chars() {
        let id = new_id();
        assert_eq!(id.len(), 24);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn board_xml_escapes_text() {
        let board = Board {
            id: "b1".to_string(),
            name: "R&D <2026>".to_string(),
            desc: String::new(),
            closed: true,
            url: "https://trello.test/b/b1".to_string(),
        };
        let xml = board_xml(&board);
        assert!(xml.contains("<name>R&amp;D &lt;2026&gt;</name>"));
        assert!(xml.contains("<closed>true</closed>"));
    }

    #[test]
    fn create_card_requires_board_id() {
        let result: Result<CreateCard, _> = serde_json::from_str(r#"{"name":"x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn update_card_all_fields_optional() {
        let input: UpdateCard = serde_json::from_str("{}").unwrap();
        assert!(input.name.is_none());
        assert!(input.closed.is_none());
    }
}
