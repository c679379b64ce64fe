pub(crate) mod complete;
pub(crate) mod initiate;
pub(crate) mod part_url;
