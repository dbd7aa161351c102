//! Collection catalogue and the foreign-key dependency graph between collections.
//!
//! The graph is declared here rather than inferred from any store: referential
//! errors during a bulk load are not silently recoverable, so every component
//! that wipes or replays tenant data walks the same explicit order.
//!
//! Declaration order of [`Collection`] *is* the forward (restore) order; the
//! derived `Ord` relies on it, so a `BTreeMap<Collection, _>` iterates parents
//! before children.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Collection {
    Users,
    Categories,
    Tags,
    Pages,
    Posts,
    Drafts,
    Comments,
    Bookmarks,
    Likes,
    Images,
    BugReports,
    PageViews,
    SiteVisitors,
}

/// A scalar reference from one record to a record in `parent`.
#[derive(Debug, Clone, Copy)]
pub struct ForeignKey {
    /// JSON field on the record (camelCase, as exported).
    pub field: &'static str,
    /// Column the reference is materialized into.
    pub column: &'static str,
    pub parent: Collection,
}

/// A many-to-many association stored as an id array on the owning record.
#[derive(Debug, Clone, Copy)]
pub struct LinkTable {
    pub field: &'static str,
    pub table: &'static str,
    pub owner_column: &'static str,
    pub target_column: &'static str,
    pub target: Collection,
}

const NO_KEYS: &[ForeignKey] = &[];

const CATEGORY_KEYS: &[ForeignKey] = &[ForeignKey {
    field: "parentId",
    column: "parent_id",
    parent: Collection::Categories,
}];

const PAGE_KEYS: &[ForeignKey] = &[ForeignKey {
    field: "authorId",
    column: "author_id",
    parent: Collection::Users,
}];

const POST_KEYS: &[ForeignKey] = &[
    ForeignKey {
        field: "authorId",
        column: "author_id",
        parent: Collection::Users,
    },
    ForeignKey {
        field: "categoryId",
        column: "category_id",
        parent: Collection::Categories,
    },
];

const DRAFT_KEYS: &[ForeignKey] = &[
    ForeignKey {
        field: "authorId",
        column: "author_id",
        parent: Collection::Users,
    },
    ForeignKey {
        field: "postId",
        column: "post_id",
        parent: Collection::Posts,
    },
];

const COMMENT_KEYS: &[ForeignKey] = &[
    ForeignKey {
        field: "postId",
        column: "post_id",
        parent: Collection::Posts,
    },
    ForeignKey {
        field: "authorId",
        column: "author_id",
        parent: Collection::Users,
    },
    ForeignKey {
        field: "parentId",
        column: "parent_id",
        parent: Collection::Comments,
    },
];

const USER_POST_KEYS: &[ForeignKey] = &[
    ForeignKey {
        field: "userId",
        column: "user_id",
        parent: Collection::Users,
    },
    ForeignKey {
        field: "postId",
        column: "post_id",
        parent: Collection::Posts,
    },
];

const IMAGE_KEYS: &[ForeignKey] = &[ForeignKey {
    field: "uploaderId",
    column: "uploader_id",
    parent: Collection::Users,
}];

const BUG_REPORT_KEYS: &[ForeignKey] = &[ForeignKey {
    field: "reporterId",
    column: "reporter_id",
    parent: Collection::Users,
}];

const POST_TAGS: LinkTable = LinkTable {
    field: "tagIds",
    table: "post_tags",
    owner_column: "post_id",
    target_column: "tag_id",
    target: Collection::Tags,
};

impl Collection {
    /// Every collection in forward dependency order.
    pub const ALL: [Collection; 13] = [
        Collection::Users,
        Collection::Categories,
        Collection::Tags,
        Collection::Pages,
        Collection::Posts,
        Collection::Drafts,
        Collection::Comments,
        Collection::Bookmarks,
        Collection::Likes,
        Collection::Images,
        Collection::BugReports,
        Collection::PageViews,
        Collection::SiteVisitors,
    ];

    /// Name used as the key in exports and snapshot documents.
    pub fn name(self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Categories => "categories",
            Collection::Tags => "tags",
            Collection::Pages => "pages",
            Collection::Posts => "posts",
            Collection::Drafts => "drafts",
            Collection::Comments => "comments",
            Collection::Bookmarks => "bookmarks",
            Collection::Likes => "likes",
            Collection::Images => "images",
            Collection::BugReports => "bugReports",
            Collection::PageViews => "pageViews",
            Collection::SiteVisitors => "siteVisitors",
        }
    }

    pub fn table(self) -> &'static str {
        match self {
            Collection::BugReports => "bug_reports",
            Collection::PageViews => "page_views",
            Collection::SiteVisitors => "site_visitors",
            other => other.name(),
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    /// Position in the forward order; parents always rank lower than children.
    pub fn rank(self) -> usize {
        self as usize
    }

    pub fn foreign_keys(self) -> &'static [ForeignKey] {
        match self {
            Collection::Categories => CATEGORY_KEYS,
            Collection::Pages => PAGE_KEYS,
            Collection::Posts => POST_KEYS,
            Collection::Drafts => DRAFT_KEYS,
            Collection::Comments => COMMENT_KEYS,
            Collection::Bookmarks | Collection::Likes => USER_POST_KEYS,
            Collection::Images => IMAGE_KEYS,
            Collection::BugReports => BUG_REPORT_KEYS,
            Collection::Users
            | Collection::Tags
            | Collection::PageViews
            | Collection::SiteVisitors => NO_KEYS,
        }
    }

    pub fn link_table(self) -> Option<&'static LinkTable> {
        match self {
            Collection::Posts => Some(&POST_TAGS),
            _ => None,
        }
    }

    /// Field referencing another record of the same collection, if any
    /// (reply comments, nested categories).
    pub fn self_reference(self) -> Option<&'static str> {
        self.foreign_keys()
            .iter()
            .find(|fk| fk.parent == self)
            .map(|fk| fk.field)
    }

    /// Other collections this one must be loaded after.
    pub fn dependencies(self) -> Vec<Collection> {
        let mut deps: Vec<Collection> = self
            .foreign_keys()
            .iter()
            .map(|fk| fk.parent)
            .chain(self.link_table().map(|link| link.target))
            .filter(|parent| *parent != self)
            .collect();
        deps.sort();
        deps.dedup();
        deps
    }

    /// Children before parents.
    pub fn wipe_order() -> impl Iterator<Item = Collection> {
        Self::ALL.into_iter().rev()
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Collection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s.trim()).ok_or_else(|| format!("Unknown collection '{}'", s))
    }
}

/// Parse a comma separated collection list such as `posts,tags,categories`.
pub fn parse_collection_list(list: &str) -> Result<Vec<Collection>, String> {
    let mut collections = list
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(str::parse)
        .collect::<Result<Vec<Collection>, String>>()?;
    collections.sort();
    collections.dedup();
    Ok(collections)
}
