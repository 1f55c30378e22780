// ABOUTME: AI service integration for Foundry
// ABOUTME: Anthropic API client for structured generation calls

pub mod service;

pub use service::{AIResponse, AIService, AIServiceError, AIServiceResult, Usage};
