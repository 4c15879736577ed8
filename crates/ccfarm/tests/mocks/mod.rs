pub mod datastore;
pub mod language_model;
pub mod news_source;
pub mod studio;
pub mod uploader;
