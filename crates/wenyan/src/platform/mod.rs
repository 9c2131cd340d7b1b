//! Content rewrites for publishing targets other than WeChat. Each function mutates the
//! styled content root in place and returns its serialized markup.

mod medium;
mod toutiao;
mod zhihu;

pub use medium::content_for_medium;
pub use toutiao::content_for_toutiao;
pub use zhihu::content_for_zhihu;
