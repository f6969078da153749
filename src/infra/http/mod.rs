pub mod edge;
mod middleware;
mod public;

pub use edge::EdgeState;
pub use middleware::{REQUEST_ID_HEADER, RequestContext};
pub use public::{HttpState, build_router};

use axum::extract::FromRef;

#[derive(Clone)]
pub struct RouterState {
    pub http: HttpState,
    pub edge: EdgeState,
}

impl FromRef<RouterState> for HttpState {
    fn from_ref(state: &RouterState) -> Self {
        state.http.clone()
    }
}

impl FromRef<RouterState> for EdgeState {
    fn from_ref(state: &RouterState) -> Self {
        state.edge.clone()
    }
}
