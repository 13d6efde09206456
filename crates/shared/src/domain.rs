use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(RecordId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Users,
    Products,
    Carts,
    Posts,
    Comments,
    Todos,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 6] = [
        ResourceKind::Users,
        ResourceKind::Products,
        ResourceKind::Carts,
        ResourceKind::Posts,
        ResourceKind::Comments,
        ResourceKind::Todos,
    ];

    /// Path segment and list-envelope key used by the remote API.
    pub fn collection(self) -> &'static str {
        match self {
            ResourceKind::Users => "users",
            ResourceKind::Products => "products",
            ResourceKind::Carts => "carts",
            ResourceKind::Posts => "posts",
            ResourceKind::Comments => "comments",
            ResourceKind::Todos => "todos",
        }
    }

    /// Capitalized singular name, as used in server error messages.
    pub fn label(self) -> &'static str {
        match self {
            ResourceKind::Users => "User",
            ResourceKind::Products => "Product",
            ResourceKind::Carts => "Cart",
            ResourceKind::Posts => "Post",
            ResourceKind::Comments => "Comment",
            ResourceKind::Todos => "Todo",
        }
    }

    pub fn from_collection(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.collection().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.collection())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: RecordId,
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub gender: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserDraft {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub gender: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: RecordId,
    pub title: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProductDraft {
    pub title: String,
    pub price: f64,
    pub description: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    #[serde(alias = "id")]
    pub product_id: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: RecordId,
    pub user_id: i64,
    #[serde(default)]
    pub total: f64,
    #[serde(default)]
    pub products: Vec<CartLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CartDraft {
    pub user_id: i64,
    pub products: Vec<CartLine>,
}

impl Default for CartDraft {
    // The cart form always starts with one empty line to fill in.
    fn default() -> Self {
        Self {
            user_id: 0,
            products: vec![CartLine::default()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: RecordId,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub user_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PostDraft {
    pub title: String,
    pub body: String,
    pub user_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentAuthor {
    pub id: i64,
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: RecordId,
    pub body: String,
    #[serde(default)]
    pub post_id: i64,
    pub user: CommentAuthor,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CommentDraft {
    pub body: String,
    pub post_id: i64,
    pub user_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: RecordId,
    pub todo: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub user_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TodoDraft {
    pub todo: String,
    pub completed: bool,
    pub user_id: i64,
}
