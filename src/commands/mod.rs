pub mod calendars;
pub mod events;
pub mod export;
pub mod import;
pub mod init;
pub mod new;
pub mod search;
