pub mod auth;
pub mod comments;
pub mod dashboard;
pub mod health;
pub mod likes;
pub mod metrics;
pub mod playlists;
pub mod subscriptions;
pub mod tweets;
pub mod user;
pub mod videos;
