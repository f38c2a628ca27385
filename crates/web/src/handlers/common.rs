use axum::response::Redirect;

pub const PROJECT_URL: &str = "https://github.com/codenotify/codenotify.run";

pub async fn get_index() -> Redirect { Redirect::temporary(PROJECT_URL) }
