mod app;
mod auth;
mod files;
mod users;

pub use app::{stats, status};
pub use auth::{connect, disconnect};
pub use files::{
    create_file, get_file, get_file_data, list_files, publish_file, unpublish_file,
};
pub use users::{create_user, get_me};
