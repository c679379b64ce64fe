pub(crate) mod multipart;
pub(crate) mod single;
