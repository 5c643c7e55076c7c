//! Typed request body for the paginated product search endpoint.
//!
//! The shape mirrors what the retailer's own web app sends; only the query,
//! filter, store and pagination vary between calls.

use serde::Serialize;

pub const HITS_PER_PAGE_DEFAULT: u32 = 50;

const ATTRIBUTES_TO_RETRIEVE: [&str; 6] = ["productID", "Type", "sponsored", "category0SI", "category1SI", "category2SI"];
const FACETS: [&str; 5] = ["brand", "category1SI", "onPromotion", "productFacets", "tobacco"];
const ANALYTICS_TAGS: [&str; 1] = ["fs#WEB:desktop"];
const AD_POSITIONS: [u32; 4] = [4, 8, 12, 16];
const SORT_ORDER: &str = "SI_POPULARITY_ASC";

/// Parameters of one search call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub text: String,
    /// Replaces the default `stores:<id>` filter when set.
    pub filter: Option<String>,
    pub page: u32,
    pub hits_per_page: u32,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            filter: None,
            page: 0,
            hits_per_page: HITS_PER_PAGE_DEFAULT,
        }
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn hits_per_page(mut self, hits_per_page: u32) -> Self {
        self.hits_per_page = hits_per_page;
        self
    }

    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Exact product lookup within one store.
    pub fn by_product_id(product_id: &str, store_id: &str) -> Self {
        Self::new(product_id)
            .filter(format!("productID:\"{}\" AND {}", product_id, store_filter(store_id)))
            .hits_per_page(1)
    }

    pub fn to_body(&self, store_id: &str) -> SearchRequestBody {
        let filters = self.filter.clone().unwrap_or_else(|| store_filter(store_id));
        SearchRequestBody {
            algolia_query: AlgoliaQuery {
                attributes_to_highlight: Vec::new(),
                attributes_to_retrieve: ATTRIBUTES_TO_RETRIEVE.to_vec(),
                facets: FACETS.to_vec(),
                filters,
                highlight_post_tag: "__/ais-highlight__",
                highlight_pre_tag: "__ais-highlight__",
                hits_per_page: self.hits_per_page,
                max_values_per_facet: 100,
                page: self.page,
                query: self.text.clone(),
                analytics_tags: ANALYTICS_TAGS.to_vec(),
            },
            algolia_facet_queries: Vec::new(),
            store_id: store_id.to_owned(),
            hits_per_page: self.hits_per_page,
            page: self.page,
            sort_order: SORT_ORDER,
            tobacco_query: true,
            precision_media: PrecisionMedia {
                ad_domain: "SEARCH_PAGE",
                ad_positions: AD_POSITIONS.to_vec(),
                publish_impression_event: false,
                disable_ads: false,
            },
        }
    }
}

pub fn store_filter(store_id: &str) -> String {
    format!("stores:{}", store_id)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequestBody {
    pub algolia_query: AlgoliaQuery,
    pub algolia_facet_queries: Vec<String>,
    pub store_id: String,
    pub hits_per_page: u32,
    pub page: u32,
    pub sort_order: &'static str,
    pub tobacco_query: bool,
    pub precision_media: PrecisionMedia,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlgoliaQuery {
    pub attributes_to_highlight: Vec<&'static str>,
    pub attributes_to_retrieve: Vec<&'static str>,
    pub facets: Vec<&'static str>,
    pub filters: String,
    pub highlight_post_tag: &'static str,
    pub highlight_pre_tag: &'static str,
    pub hits_per_page: u32,
    pub max_values_per_facet: u32,
    pub page: u32,
    pub query: String,
    pub analytics_tags: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrecisionMedia {
    pub ad_domain: &'static str,
    pub ad_positions: Vec<u32>,
    pub publish_impression_event: bool,
    pub disable_ads: bool,
}
