use std::{fmt::Debug, sync::LazyLock};

use regex::Regex;
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    domain::{
        Cart, CartDraft, Comment, CommentAuthor, CommentDraft, Post, PostDraft, Product,
        ProductDraft, RecordId, ResourceKind, Todo, TodoDraft, User, UserDraft,
    },
    error::ValidationError,
};

/// Binds a collection of the remote API to its record and form-draft types.
///
/// Every collection shares the same lifecycle: a draft is validated locally,
/// sent as the request body, and turned into a record once the server has
/// accepted it. Implementors only describe the per-collection pieces.
pub trait Resource: Send + Sync + 'static {
    const KIND: ResourceKind;

    type Record: Clone + Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static;
    type Draft: Clone + Debug + Default + Serialize + DeserializeOwned + Send + Sync + 'static;

    fn id(record: &Self::Record) -> RecordId;

    /// Field rules checked before any request is sent.
    fn validate(draft: &Self::Draft) -> Result<(), ValidationError>;

    /// Builds the record the server would hold for `draft` under `id`.
    fn materialize(id: RecordId, draft: &Self::Draft) -> Self::Record;

    fn to_draft(record: &Self::Record) -> Self::Draft;

    /// Applies an accepted update. Fields the draft does not carry keep their
    /// current value.
    fn apply(record: &Self::Record, draft: &Self::Draft) -> Self::Record {
        Self::materialize(Self::id(record), draft)
    }
}

fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField { field });
    }
    Ok(())
}

fn require_positive(field: &'static str, value: i64) -> Result<(), ValidationError> {
    if value <= 0 {
        return Err(ValidationError::NotPositive { field });
    }
    Ok(())
}

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern"));

/// Accepts `local@domain.tld`: no whitespace, exactly one `@`, and a dot inside
/// the domain with text on both sides.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL.is_match(email)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Users;

impl Resource for Users {
    const KIND: ResourceKind = ResourceKind::Users;
    type Record = User;
    type Draft = UserDraft;

    fn id(record: &User) -> RecordId {
        record.id
    }

    fn validate(draft: &UserDraft) -> Result<(), ValidationError> {
        require_text("firstName", &draft.first_name)?;
        require_text("email", &draft.email)?;
        require_text("gender", &draft.gender)?;
        if !is_valid_email(&draft.email) {
            return Err(ValidationError::InvalidEmail(draft.email.clone()));
        }
        let gender = draft.gender.to_ascii_lowercase();
        if gender != "male" && gender != "female" {
            return Err(ValidationError::InvalidGender(draft.gender.clone()));
        }
        Ok(())
    }

    fn materialize(id: RecordId, draft: &UserDraft) -> User {
        User {
            id,
            first_name: draft.first_name.clone(),
            last_name: draft.last_name.clone(),
            email: draft.email.clone(),
            gender: draft.gender.clone(),
        }
    }

    fn to_draft(record: &User) -> UserDraft {
        UserDraft {
            first_name: record.first_name.clone(),
            last_name: record.last_name.clone(),
            email: record.email.clone(),
            gender: record.gender.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Products;

impl Resource for Products {
    const KIND: ResourceKind = ResourceKind::Products;
    type Record = Product;
    type Draft = ProductDraft;

    fn id(record: &Product) -> RecordId {
        record.id
    }

    fn validate(draft: &ProductDraft) -> Result<(), ValidationError> {
        require_text("title", &draft.title)?;
        if !(draft.price > 0.0) {
            return Err(ValidationError::NotPositive { field: "price" });
        }
        Ok(())
    }

    fn materialize(id: RecordId, draft: &ProductDraft) -> Product {
        Product {
            id,
            title: draft.title.clone(),
            price: draft.price,
            description: draft.description.clone(),
        }
    }

    fn to_draft(record: &Product) -> ProductDraft {
        ProductDraft {
            title: record.title.clone(),
            price: record.price,
            description: record.description.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Carts;

impl Resource for Carts {
    const KIND: ResourceKind = ResourceKind::Carts;
    type Record = Cart;
    type Draft = CartDraft;

    fn id(record: &Cart) -> RecordId {
        record.id
    }

    fn validate(draft: &CartDraft) -> Result<(), ValidationError> {
        require_positive("userId", draft.user_id)?;
        if draft.products.is_empty() {
            return Err(ValidationError::EmptyLines);
        }
        for line in &draft.products {
            require_positive("productId", line.product_id)?;
            require_positive("quantity", line.quantity)?;
        }
        Ok(())
    }

    fn materialize(id: RecordId, draft: &CartDraft) -> Cart {
        Cart {
            id,
            user_id: draft.user_id,
            total: 0.0,
            products: draft.products.clone(),
        }
    }

    fn to_draft(record: &Cart) -> CartDraft {
        CartDraft {
            user_id: record.user_id,
            products: record.products.clone(),
        }
    }

    fn apply(record: &Cart, draft: &CartDraft) -> Cart {
        // The total is computed server-side; keep the last known one.
        Cart {
            total: record.total,
            ..Self::materialize(record.id, draft)
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Posts;

impl Resource for Posts {
    const KIND: ResourceKind = ResourceKind::Posts;
    type Record = Post;
    type Draft = PostDraft;

    fn id(record: &Post) -> RecordId {
        record.id
    }

    fn validate(draft: &PostDraft) -> Result<(), ValidationError> {
        require_text("title", &draft.title)?;
        require_text("body", &draft.body)?;
        require_positive("userId", draft.user_id)
    }

    fn materialize(id: RecordId, draft: &PostDraft) -> Post {
        Post {
            id,
            title: draft.title.clone(),
            body: draft.body.clone(),
            user_id: draft.user_id,
        }
    }

    fn to_draft(record: &Post) -> PostDraft {
        PostDraft {
            title: record.title.clone(),
            body: record.body.clone(),
            user_id: record.user_id,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Comments;

impl Resource for Comments {
    const KIND: ResourceKind = ResourceKind::Comments;
    type Record = Comment;
    type Draft = CommentDraft;

    fn id(record: &Comment) -> RecordId {
        record.id
    }

    fn validate(draft: &CommentDraft) -> Result<(), ValidationError> {
        require_text("body", &draft.body)?;
        require_positive("postId", draft.post_id)?;
        require_positive("userId", draft.user_id)
    }

    fn materialize(id: RecordId, draft: &CommentDraft) -> Comment {
        Comment {
            id,
            body: draft.body.clone(),
            post_id: draft.post_id,
            user: CommentAuthor {
                id: draft.user_id,
                username: format!("user-{}", draft.user_id),
            },
        }
    }

    fn to_draft(record: &Comment) -> CommentDraft {
        CommentDraft {
            body: record.body.clone(),
            post_id: record.post_id,
            user_id: record.user.id,
        }
    }

    fn apply(record: &Comment, draft: &CommentDraft) -> Comment {
        let mut updated = Self::materialize(record.id, draft);
        if record.user.id == draft.user_id {
            updated.user.username = record.user.username.clone();
        }
        updated
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Todos;

impl Resource for Todos {
    const KIND: ResourceKind = ResourceKind::Todos;
    type Record = Todo;
    type Draft = TodoDraft;

    fn id(record: &Todo) -> RecordId {
        record.id
    }

    fn validate(draft: &TodoDraft) -> Result<(), ValidationError> {
        require_text("todo", &draft.todo)?;
        require_positive("userId", draft.user_id)
    }

    fn materialize(id: RecordId, draft: &TodoDraft) -> Todo {
        Todo {
            id,
            todo: draft.todo.clone(),
            completed: draft.completed,
            user_id: draft.user_id,
        }
    }

    fn to_draft(record: &Todo) -> TodoDraft {
        TodoDraft {
            todo: record.todo.clone(),
            completed: record.completed,
            user_id: record.user_id,
        }
    }
}

#[cfg(test)]
#[path = "tests/resource_tests.rs"]
mod tests;
