pub mod requests;
pub mod responses;

pub use requests::{CreatePostRequest, ListPostsParams, ListPostsQuery};
pub use responses::PaginatedResponse;
