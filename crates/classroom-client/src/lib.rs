//! Class creation workflow.
//!
//! An operator searches the user directory for teachers, staff and students,
//! collects them into three per-role selection sets, names the class and
//! submits it to the channel repository. [`ClassForm`] holds that state;
//! the directory and repository are reached through the [`UserDirectory`]
//! and [`ChannelRepository`] traits, implemented over HTTP by
//! [`HttpBackend`].

pub mod backend;
pub mod error;
pub mod form;
pub mod http;
pub mod search;
pub mod selection;

pub use backend::{ChannelRepository, UserDirectory};
pub use error::{ClientError, SubmitError};
pub use form::ClassForm;
pub use http::HttpBackend;
pub use search::{SearchRequest, SearchResponse};
pub use selection::SelectionSet;
