use shared::{
    domain::{Cart, CartLine, Comment, CommentAuthor, Post, Product, RecordId, Todo, User},
    resource::{Carts, Comments, Posts, Products, Resource, Todos, Users},
};
use tokio::sync::RwLock;

use super::{ApiContext, Collection};

const FIRST_NAMES: [&str; 10] = [
    "Emily", "Michael", "Sophia", "James", "Emma", "Alexander", "Olivia", "Liam", "Ava", "Noah",
];
const LAST_NAMES: [&str; 10] = [
    "Johnson", "Williams", "Brown", "Davis", "Miller", "Jones", "Garcia", "Wilson", "Taylor",
    "Moore",
];
const PRODUCT_NAMES: [&str; 8] = [
    "Essence Mascara",
    "Eyeshadow Palette",
    "Powder Canister",
    "Red Lipstick",
    "Nail Polish",
    "Calvin Klein Eau",
    "Dior J'adore",
    "Gucci Bloom",
];
const TOPICS: [&str; 6] = [
    "His mother had always taught him",
    "He was an expert but not in a discipline",
    "Dave watched as the forest burned up on the hill",
    "All he wanted was a candy bar",
    "Hopes and dreams were dashed that day",
    "The paper was blank",
];
const TASKS: [&str; 8] = [
    "Do something nice for someone you care about",
    "Memorize a poem",
    "Watch a classic movie",
    "Contribute code to an open source project",
    "Solve a Rubik's cube",
    "Bake pastries for yourself and neighbor",
    "Go see a Broadway production",
    "Write a thank you letter to an influential person",
];

fn pick<T: Copy>(items: &[T], n: i64) -> T {
    items[(n.unsigned_abs() as usize) % items.len()]
}

/// Owner ids cycle over the first ten users.
fn owner(n: i64) -> i64 {
    n.rem_euclid(10) + 1
}

fn product_price(product_id: i64) -> f64 {
    (product_id * 37).rem_euclid(100) as f64 + 0.99
}

/// Login name of a user account: lowercase first name followed by the id.
pub fn account_username(user: &User) -> String {
    format!("{}{}", user.first_name.to_ascii_lowercase(), user.id)
}

pub fn account_password(user: &User) -> String {
    format!("{}pass", account_username(user))
}

/// A collection the mock server can seed and store.
pub trait Seeded: Resource + Sized {
    fn seed(n: i64) -> Self::Record;

    fn collection(ctx: &ApiContext) -> &RwLock<Collection<Self>>;

    /// Recomputes server-owned fields after a write.
    fn finalize(_record: &mut Self::Record) {}
}

impl Seeded for Users {
    fn seed(n: i64) -> User {
        let first = pick(&FIRST_NAMES, n - 1);
        let last = pick(&LAST_NAMES, (n - 1) / 10 + n);
        User {
            id: RecordId(n),
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: format!(
                "{}.{}@x.example.com",
                first.to_ascii_lowercase(),
                last.to_ascii_lowercase()
            ),
            gender: if (n - 1) % 2 == 0 { "female" } else { "male" }.to_string(),
        }
    }

    fn collection(ctx: &ApiContext) -> &RwLock<Collection<Self>> {
        ctx.users()
    }
}

impl Seeded for Products {
    fn seed(n: i64) -> Product {
        let name = pick(&PRODUCT_NAMES, n - 1);
        Product {
            id: RecordId(n),
            title: format!("{name} {n}"),
            price: product_price(n),
            description: format!("{name}, batch {}.", (n - 1) / 8 + 1),
        }
    }

    fn collection(ctx: &ApiContext) -> &RwLock<Collection<Self>> {
        ctx.products()
    }
}

impl Seeded for Carts {
    fn seed(n: i64) -> Cart {
        Cart {
            id: RecordId(n),
            user_id: owner(n),
            total: 0.0,
            products: vec![
                CartLine {
                    product_id: (n * 3).rem_euclid(20) + 1,
                    quantity: n % 3 + 1,
                },
                CartLine {
                    product_id: (n * 7).rem_euclid(20) + 2,
                    quantity: n % 2 + 1,
                },
            ],
        }
    }

    fn collection(ctx: &ApiContext) -> &RwLock<Collection<Self>> {
        ctx.carts()
    }

    fn finalize(record: &mut Cart) {
        let total: f64 = record
            .products
            .iter()
            .map(|line| product_price(line.product_id) * line.quantity as f64)
            .sum();
        record.total = (total * 100.0).round() / 100.0;
    }
}

impl Seeded for Posts {
    fn seed(n: i64) -> Post {
        let topic = pick(&TOPICS, n - 1);
        Post {
            id: RecordId(n),
            title: format!("{topic} ({n})"),
            body: format!("{topic}. Post number {n} of the seeded feed."),
            user_id: owner(n),
        }
    }

    fn collection(ctx: &ApiContext) -> &RwLock<Collection<Self>> {
        ctx.posts()
    }
}

impl Seeded for Comments {
    fn seed(n: i64) -> Comment {
        let user_id = owner(n + 3);
        Comment {
            id: RecordId(n),
            body: format!("Comment {n}: {}", pick(&TOPICS, n + 2).to_ascii_lowercase()),
            post_id: owner(n),
            user: CommentAuthor {
                id: user_id,
                username: format!("user-{user_id}"),
            },
        }
    }

    fn collection(ctx: &ApiContext) -> &RwLock<Collection<Self>> {
        ctx.comments()
    }
}

impl Seeded for Todos {
    fn seed(n: i64) -> Todo {
        Todo {
            id: RecordId(n),
            todo: pick(&TASKS, n - 1).to_string(),
            completed: n % 3 == 0,
            user_id: owner(n),
        }
    }

    fn collection(ctx: &ApiContext) -> &RwLock<Collection<Self>> {
        ctx.todos()
    }
}
