//! Course content: public listing, premium sample payload, and the
//! admin-side CRUD with file uploads.

pub mod handlers;
