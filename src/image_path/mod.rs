//! ImagePath - backend path strings to servable image URLs
//!
//! - `resolver`: stateless path normalization rules
//! - `cache`: bounded memo in front of the resolver

mod cache;
mod resolver;

pub use cache::{ResolutionCache, ResolutionCacheConfig, ResolutionCacheStats, SharedResolutionCache};
pub use resolver::{PathResolver, ResolveRule, ResolvedPath, ResolverConfig};
