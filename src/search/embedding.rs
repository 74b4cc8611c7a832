//! Embedding providers
//!
//! [`EmbeddingProvider`] is the seam to whatever produces vectors (a local
//! model server, a hosted API). The built-in [`HtpEmbedder`] implements
//! Harmonic Token Projection: deterministic, training-free, and needs no
//! model files.
//!
//! Reference: "Harmonic Token Projection: A Vocabulary-Free, Training-Free,
//! Deterministic, and Reversible Embedding Methodology"
//! https://arxiv.org/html/2511.20665

use async_trait::async_trait;
use std::f64::consts::PI;

use crate::error::{RagError, Result};

/// Default embedding dimension (matches common 768-d sentence encoders).
pub const EMBEDDING_DIM: usize = 768;

/// Maximum token length (Unicode code points)
const MAX_TOKEN_LENGTH: usize = 64;

/// Text → fixed-length vector. Fallible and possibly slow.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Length of every vector this provider returns.
    fn dimension(&self) -> usize;
}

/// HTP embedder
pub struct HtpEmbedder {
    moduli: Vec<u64>,
}

impl HtpEmbedder {
    /// `dimension` must be even: each modulus contributes a (sin, cos) pair.
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 || dimension % 2 != 0 {
            return Err(RagError::InvalidConfig(format!(
                "HTP dimension must be a positive even number, got {}",
                dimension
            )));
        }
        Ok(Self {
            moduli: first_primes(dimension / 2),
        })
    }

    /// Generate embedding for a single text
    ///
    /// Algorithm:
    /// 1. Tokenize text into words
    /// 2. Embed each token using harmonic projection
    /// 3. Average token embeddings (mean pooling)
    /// 4. L2 normalize result
    ///
    /// Text without tokens maps to the zero vector.
    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let dim = self.moduli.len() * 2;
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return vec![0.0; dim];
        }

        let mut sum = vec![0.0f64; dim];
        for token in &tokens {
            for (slot, val) in sum.iter_mut().zip(self.embed_token(token)) {
                *slot += val;
            }
        }
        let count = tokens.len() as f64;
        for val in &mut sum {
            *val /= count;
        }

        let norm: f64 = sum.iter().map(|x| x * x).sum::<f64>().sqrt();
        if norm > 0.0 {
            sum.iter().map(|x| (*x / norm) as f32).collect()
        } else {
            sum.iter().map(|x| *x as f32).collect()
        }
    }

    /// Project one token onto the unit circle once per modulus:
    /// `E_i = [sin(2πr_i/m_i), cos(2πr_i/m_i)]` with `r_i = N mod m_i`.
    fn embed_token(&self, token: &str) -> Vec<f64> {
        let n = token_to_integer(token);
        let mut embedding = Vec::with_capacity(self.moduli.len() * 2);
        for &m in &self.moduli {
            let theta = 2.0 * PI * ((n % m) as f64) / (m as f64);
            embedding.push(theta.sin());
            embedding.push(theta.cos());
        }
        embedding
    }
}

#[async_trait]
impl EmbeddingProvider for HtpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }

    fn dimension(&self) -> usize {
        self.moduli.len() * 2
    }
}

/// N = Σ u_j · B^(L-j) with B = 2^16, wrapping on overflow.
fn token_to_integer(token: &str) -> u64 {
    token
        .chars()
        .take(MAX_TOKEN_LENGTH)
        .fold(0u64, |n, c| n.wrapping_mul(65536).wrapping_add(c as u64))
}

/// First `count` primes; pairwise coprime by construction.
fn first_primes(count: usize) -> Vec<u64> {
    let mut primes: Vec<u64> = Vec::with_capacity(count);
    let mut candidate = 2u64;
    while primes.len() < count {
        if primes
            .iter()
            .take_while(|&&p| p * p <= candidate)
            .all(|&p| candidate % p != 0)
        {
            primes.push(candidate);
        }
        candidate += 1;
    }
    primes
}

/// Splits text into words, normalizes to lowercase
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| c.is_whitespace() || c.is_ascii_punctuation())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
        .collect()
}

/// `a·b / (|a| |b|)`, in [-1, 1].
///
/// 0.0 when either vector has zero magnitude (including empty vectors) or
/// when the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let (dot, sq_a, sq_b) = a
        .iter()
        .zip(b)
        .fold((0.0f32, 0.0f32, 0.0f32), |(dot, sa, sb), (x, y)| {
            (dot + x * y, sa + x * x, sb + y * y)
        });
    if sq_a == 0.0 || sq_b == 0.0 {
        return 0.0;
    }
    dot / (sq_a.sqrt() * sq_b.sqrt())
}
