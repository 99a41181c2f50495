// 對外部系統的具體實作：Xubio HTTP API、token 端點、本機檔案與輸出格式

pub mod auth;
pub mod csv_bundle;
pub mod http;
pub mod storage;
pub mod xlsx;

pub use auth::TokenClient;
pub use http::XubioClient;
pub use storage::LocalStorage;
