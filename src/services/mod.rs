pub mod brand_rewriter;
pub mod scoring_injector;
pub mod theme_injector;

pub use brand_rewriter::{BrandRewrite, BrandRewriter};
pub use scoring_injector::{EnginePlacement, EngineSettings, ScoredDocument, ScoringInjector};
pub use theme_injector::{StylesheetPlacement, ThemeInjector, ThemedDocument};
