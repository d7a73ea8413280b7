use reelhouse_api::ApiRequest;
use tracing::debug;

use crate::model::{Film, Page, SearchParams};
use crate::request::Requester;

const SEARCH_PATH: &str = "/films/search";

#[derive(Debug, Clone)]
pub struct FilmService {
    requester: Requester,
}

impl FilmService {
    pub fn new(requester: Requester) -> Self {
        Self { requester }
    }

    pub async fn search(&self, params: &SearchParams) -> Option<Page<Film>> {
        let mut request = ApiRequest::get(SEARCH_PATH);
        request.query = params.to_query();
        let page: Page<Film> = self.requester.execute(request).await?;
        debug!(query = %params.query, hits = page.results.len(), "film search");
        Some(page)
    }
}
