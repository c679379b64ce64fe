pub use coachly_types::api::upload::complete::single::{ENDPOINT, Request, Response};

use crate::{client::UploadClient, error::Error};

pub(crate) async fn post(client: &UploadClient, request: &Request<'_>) -> Result<Response, Error> {
	client.post_request(request, ENDPOINT).await
}
