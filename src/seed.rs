//! Sample data for trying the tools out.
//!
//! Recreates `users`, `products` and `orders` with their indexes and a few
//! documents covering nested objects, arrays, dates and cross-collection
//! references.

use mongodb::bson::{doc, oid::ObjectId, DateTime, Document};
use tracing::{debug, info};

use crate::error::Result;
use crate::store::{DocumentStore, IndexSpec};

/// Names of the collections [`seed_sample_data`] replaces.
pub const SAMPLE_COLLECTIONS: [&str; 3] = ["users", "products", "orders"];

// Midnight UTC, in milliseconds since the epoch.
const JAN_1_2023: i64 = 1_672_531_200_000;
const FEB_15_2023: i64 = 1_676_419_200_000;
const JAN_15_2024: i64 = 1_705_276_800_000;
const FEB_1_2024: i64 = 1_706_745_600_000;

/// What was written to one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeededCollection {
    /// Collection name
    pub name: &'static str,
    /// Documents inserted
    pub documents: usize,
    /// Secondary indexes created
    pub indexes: usize,
}

fn index(field: &str, unique: bool) -> IndexSpec {
    IndexSpec {
        field: field.to_string(),
        order: 1,
        unique,
        name: None,
    }
}

/// Drop and repopulate the sample collections.
///
/// Running it twice leaves the same data behind (with fresh ids).
pub async fn seed_sample_data(store: &dyn DocumentStore) -> Result<Vec<SeededCollection>> {
    let john = ObjectId::new();
    let jane = ObjectId::new();

    let plan: [(&'static str, Vec<IndexSpec>, Vec<Document>); 3] = [
        (
            "users",
            vec![index("email", true), index("address.city", false)],
            users(john, jane),
        ),
        (
            "products",
            vec![index("sku", true), index("category", false)],
            products(),
        ),
        (
            "orders",
            vec![index("userId", false), index("orderDate", false)],
            orders(john, jane),
        ),
    ];

    let mut seeded = Vec::with_capacity(plan.len());
    for (name, indexes, documents) in plan {
        store.drop_collection(name).await?;
        let index_count = indexes.len();
        for spec in indexes {
            let index_name = store.create_index(name, spec).await?;
            debug!(collection = name, index = %index_name, "Created sample index");
        }
        let document_count = documents.len();
        for document in documents {
            store.insert_one(name, document).await?;
        }
        seeded.push(SeededCollection {
            name,
            documents: document_count,
            indexes: index_count,
        });
    }

    info!(database = store.database_name(), "Sample data seeded");
    Ok(seeded)
}

fn users(john: ObjectId, jane: ObjectId) -> Vec<Document> {
    vec![
        doc! {
            "_id": john,
            "email": "john@example.com",
            "name": "John Doe",
            "age": 30,
            "address": {
                "street": "123 Main St",
                "city": "New York",
                "country": "USA",
                "coordinates": { "lat": 40.7128, "lng": -74.006 }
            },
            "interests": ["sports", "technology"],
            "memberSince": DateTime::from_millis(JAN_1_2023),
            "isActive": true
        },
        doc! {
            "_id": jane,
            "email": "jane@example.com",
            "name": "Jane Smith",
            "age": 25,
            "address": {
                "street": "456 Market St",
                "city": "San Francisco",
                "country": "USA",
                "coordinates": { "lat": 37.7749, "lng": -122.4194 }
            },
            "interests": ["art", "music", "travel"],
            "memberSince": DateTime::from_millis(FEB_15_2023),
            "isActive": true
        },
    ]
}

fn products() -> Vec<Document> {
    let now = DateTime::now();
    vec![
        doc! {
            "_id": ObjectId::new(),
            "sku": "LAPTOP001",
            "name": "Pro Laptop",
            "category": "Electronics",
            "price": 1299.99,
            "specs": { "cpu": "Intel i7", "ram": "16GB", "storage": "512GB SSD" },
            "inStock": true,
            "tags": ["laptop", "computer", "work"],
            "ratings": [4.5, 4.8, 4.2],
            "lastUpdated": now
        },
        doc! {
            "_id": ObjectId::new(),
            "sku": "PHONE001",
            "name": "SmartPhone X",
            "category": "Electronics",
            "price": 699.99,
            "specs": { "screen": "6.1 inch", "camera": "12MP", "storage": "256GB" },
            "inStock": true,
            "tags": ["phone", "mobile", "smart device"],
            "ratings": [4.7, 4.6],
            "lastUpdated": now
        },
        doc! {
            "_id": ObjectId::new(),
            "sku": "BOOK001",
            "name": "Database Design",
            "category": "Books",
            "price": 49.99,
            "specs": { "format": "Hardcover", "pages": 500, "language": "English" },
            "inStock": false,
            "tags": ["education", "technology", "programming"],
            "ratings": [4.9],
            "lastUpdated": now
        },
    ]
}

fn orders(john: ObjectId, jane: ObjectId) -> Vec<Document> {
    vec![
        doc! {
            "_id": ObjectId::new(),
            "userId": john,
            "orderDate": DateTime::from_millis(JAN_15_2024),
            "status": "completed",
            "items": [
                { "productSku": "LAPTOP001", "quantity": 1, "priceAtTime": 1299.99 },
                { "productSku": "BOOK001", "quantity": 2, "priceAtTime": 49.99 }
            ],
            "totalAmount": 1399.97,
            "shippingAddress": { "street": "123 Main St", "city": "New York", "country": "USA" },
            "paymentMethod": { "type": "credit_card", "last4": "4242" }
        },
        doc! {
            "_id": ObjectId::new(),
            "userId": jane,
            "orderDate": DateTime::from_millis(FEB_1_2024),
            "status": "processing",
            "items": [
                { "productSku": "PHONE001", "quantity": 1, "priceAtTime": 699.99 }
            ],
            "totalAmount": 699.99,
            "shippingAddress": {
                "street": "456 Market St",
                "city": "San Francisco",
                "country": "USA"
            },
            "paymentMethod": { "type": "paypal", "email": "jane@example.com" }
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_seed_populates_collections() {
        let store = MemoryStore::new("test");
        let seeded = seed_sample_data(&store).await.unwrap();
        let names: Vec<&str> = seeded.iter().map(|c| c.name).collect();
        assert_eq!(names, SAMPLE_COLLECTIONS);

        assert_eq!(store.count_documents("users").await.unwrap(), 2);
        assert_eq!(store.count_documents("products").await.unwrap(), 3);
        assert_eq!(store.count_documents("orders").await.unwrap(), 2);
        assert_eq!(store.list_indexes("users").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_seed_twice_replaces_data() {
        let store = MemoryStore::new("test");
        seed_sample_data(&store).await.unwrap();
        seed_sample_data(&store).await.unwrap();
        assert_eq!(store.count_documents("products").await.unwrap(), 3);
        assert_eq!(store.list_indexes("products").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_orders_reference_users() {
        let store = MemoryStore::new("test");
        seed_sample_data(&store).await.unwrap();
        let john = store
            .find("users", doc! { "email": "john@example.com" }, None, 1)
            .await
            .unwrap();
        let id = john[0].get("_id").cloned().unwrap();
        let orders = store
            .find("orders", doc! { "userId": id }, None, 10)
            .await
            .unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].get_str("status").unwrap(), "completed");
    }
}
