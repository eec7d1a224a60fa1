pub mod store;
pub mod sync;

pub use store::RouteStore;
pub use sync::{
    ChannelRouteConfigSource, HttpRouteConfigSource, RouteConfigSource, RouteRefresh,
    RouteSynchronizer,
};
