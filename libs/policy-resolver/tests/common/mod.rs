//! Blog domain shared by the integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use policy_resolver::{PolicyResolver, TypeCatalog};
use policy_resolver_sdk::{Entity, Policy, PolicyRef, Query, Repository, Resource};

pub struct Article {
    pub id: u64,
    pub author: String,
}

impl Resource for Article {
    fn as_entity(&self) -> Option<&dyn Entity> {
        Some(self)
    }
}

impl Entity for Article {}

pub struct Comments {
    pub id: u64,
    pub body: String,
}

impl Resource for Comments {
    fn as_entity(&self) -> Option<&dyn Entity> {
        Some(self)
    }
}

impl Entity for Comments {}

#[derive(Default)]
pub struct ArticlesTable;

impl Resource for ArticlesTable {
    fn as_repository(&self) -> Option<&dyn Repository> {
        Some(self)
    }
}

impl Repository for ArticlesTable {
    fn alias(&self) -> &str {
        "Articles"
    }
}

#[derive(Default)]
pub struct SelectQuery {
    table: ArticlesTable,
    pub conditions: Vec<String>,
}

impl Resource for SelectQuery {
    fn as_query(&self) -> Option<&dyn Query> {
        Some(self)
    }
}

impl Query for SelectQuery {
    fn repository(&self) -> &dyn Repository {
        &self.table
    }
}

/// Plain object with no data-access capability.
pub struct Upload {
    pub size: u64,
}

impl Resource for Upload {}

#[derive(Debug, Default)]
pub struct ArticlePolicy;

impl Policy for ArticlePolicy {}

impl ArticlePolicy {
    pub fn can_edit(&self, user: &str, article: &Article) -> bool {
        article.author == user
    }
}

#[derive(Debug, Default)]
pub struct ArticlesTablePolicy;

impl Policy for ArticlesTablePolicy {}

/// Shared policy with state, to observe that every resolution sees the same
/// object.
#[derive(Debug, Default)]
pub struct CommentsPolicy {
    pub checks: AtomicUsize,
}

impl Policy for CommentsPolicy {}

impl CommentsPolicy {
    pub fn can_view(&self, _comment: &Comments) -> bool {
        self.checks.fetch_add(1, Ordering::SeqCst);
        true
    }
}

#[derive(Debug)]
pub struct UploadPolicy {
    pub max_size: u64,
}

impl Policy for UploadPolicy {}

pub fn upload_factory(resource: &dyn Resource, _resolver: &PolicyResolver) -> PolicyRef {
    let size = resource
        .as_any()
        .downcast_ref::<Upload>()
        .map_or(0, |u| u.size);
    Arc::new(UploadPolicy {
        max_size: size.max(1024),
    })
}

pub fn article(author: &str) -> Article {
    Article {
        id: 1,
        author: author.to_owned(),
    }
}

pub fn comment(id: u64) -> Comments {
    Comments {
        id,
        body: "first".to_owned(),
    }
}

/// Catalog exposing the whole blog domain by name.
pub fn catalog(shared_comments: PolicyRef) -> TypeCatalog {
    TypeCatalog::new()
        .with_resource::<Article>("Article")
        .with_resource::<Comments>("Comments")
        .with_resource::<ArticlesTable>("Articles")
        .with_resource::<SelectQuery>("ArticlesQuery")
        .with_resource::<Upload>("Upload")
        .with_policy_class::<ArticlePolicy>("ArticlePolicy")
        .with_policy_class::<ArticlesTablePolicy>("ArticlesTablePolicy")
        .with_policy_instance("shared_comments", shared_comments)
        .with_policy_factory("upload_by_size", upload_factory)
}
