// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Provider-side resume types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `GET /me` response (subset).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Me {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

/// A resume as listed by `/resumes/mine` or read by `/resumes/{id}`.
///
/// Fields not modelled here are kept in `extra` so that a read-modify-write
/// cycle does not drop them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resume {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub experience: Vec<Experience>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One employment entry on a resume.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub position: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `GET /resumes/{id}/status` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResumeStatus {
    #[serde(default)]
    pub blocked: bool,
    #[serde(default)]
    pub finished: bool,
    #[serde(default)]
    pub can_publish_or_update: bool,
    #[serde(default)]
    pub publish_url: Option<String>,
}

/// Paged wrapper around `/resumes/mine`.
#[derive(Debug, Clone, Deserialize)]
pub struct ResumeList {
    #[serde(default)]
    pub items: Vec<Resume>,
}
