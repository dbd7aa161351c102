//! Common test data and constants

use domain_agent::types::{from_wire, CollectionData, WireCollections};
use serde_json::{json, Value};

pub const ADMIN_TOKEN: &str = "test-admin-token";
pub const INTERNAL_SECRET: &str = "test-internal-secret";

/// Common test tenants
pub mod tenants {
    pub const ACME: &str = "acme";
    pub const GLOBEX: &str = "globex";
}

/// Parse `{ collection: [record] }` JSON into typed collections
pub fn collections(value: Value) -> CollectionData {
    let wire: WireCollections = serde_json::from_value(value).expect("collections must be objects of arrays");
    let (data, unknown) = from_wire(wire);
    assert!(unknown.is_empty(), "unknown collections in fixture: {:?}", unknown);
    data
}

pub fn blog_users() -> Value {
    json!([
        {"id": "u1", "email": "admin@acme.io", "name": "Admin", "externalId": "idp|admin-old"},
        {"id": "u2", "email": "writer@acme.io", "name": "Writer"}
    ])
}

/// Two categories, three posts, one comment, plus what they refer to.
pub fn blog_data() -> Value {
    json!({
        "users": blog_users(),
        "categories": [
            {"id": "c1", "name": "News"},
            {"id": "c2", "name": "Releases", "parentId": "c1"}
        ],
        "tags": [
            {"id": "t1", "name": "rust"},
            {"id": "t2", "name": "backups"}
        ],
        "posts": [
            {"id": "p1", "title": "Hello", "authorId": "u1", "categoryId": "c1", "tagIds": ["t1", "t2"]},
            {"id": "p2", "title": "Release notes", "authorId": "u2", "categoryId": "c2", "tagIds": ["t1"]},
            {"id": "p3", "title": "Roadmap", "authorId": "u2", "categoryId": "c2"}
        ],
        "comments": [
            {"id": "cm1", "postId": "p1", "authorId": "u2", "body": "Nice"}
        ]
    })
}

/// Per-service split of [`blog_data`] as each service would export it
pub mod exports {
    use serde_json::{json, Value};

    pub fn identity() -> Value {
        json!({ "users": super::blog_users() })
    }

    pub fn content() -> Value {
        let data = super::blog_data();
        json!({
            "categories": data["categories"],
            "tags": data["tags"],
            "pages": [],
            "posts": data["posts"],
            "drafts": [],
            "bookmarks": [],
            "likes": []
        })
    }

    pub fn comments() -> Value {
        json!({ "comments": super::blog_data()["comments"] })
    }
}
