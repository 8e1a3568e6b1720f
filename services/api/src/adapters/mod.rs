pub mod gemini;

pub use gemini::GeminiPlanAdapter;
