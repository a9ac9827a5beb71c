//! Demo catalogue used to populate an empty local store the first time the
//! app runs without a reachable backend.

use chrono::{DateTime, TimeZone, Utc};
use dormglide_shared::{Condition, Product};

struct DemoListing {
    id: &'static str,
    title: &'static str,
    description: &'static str,
    price: f64,
    category: &'static str,
    condition: Condition,
    location: &'static str,
    image: &'static str,
    seller_id: &'static str,
    seller_name: &'static str,
    seller_email: &'static str,
    created_at: (i32, u32, u32, u32, u32),
    views: u64,
}

const DEMO_LISTINGS: &[DemoListing] = &[
    DemoListing {
        id: "1",
        title: "MacBook Air M1 13-inch",
        description: "Barely used, comes with the original charger and box.",
        price: 850.0,
        category: "Electronics",
        condition: Condition::LikeNew,
        location: "North Campus",
        image: "https://images.unsplash.com/photo-1517336714731-489689fd1ca8?w=600&h=400&fit=crop",
        seller_id: "user1",
        seller_name: "Sarah Chen",
        seller_email: "sarah.chen@university.edu",
        created_at: (2025, 1, 15, 10, 30),
        views: 45,
    },
    DemoListing {
        id: "2",
        title: "Calculus Textbook (Stewart 8th Edition)",
        description: "All pages intact, minimal highlighting.",
        price: 120.0,
        category: "Textbooks",
        condition: Condition::Good,
        location: "South Campus",
        image: "https://images.unsplash.com/photo-1544716278-ca5e3f4abd8c?w=600&h=400&fit=crop",
        seller_id: "user2",
        seller_name: "Mike Rodriguez",
        seller_email: "mike.r@university.edu",
        created_at: (2025, 1, 14, 15, 45),
        views: 23,
    },
    DemoListing {
        id: "3",
        title: "IKEA Study Desk with Drawer",
        description: "White desk with one drawer, easy to disassemble.",
        price: 60.0,
        category: "Furniture",
        condition: Condition::Good,
        location: "East Campus",
        image: "https://images.unsplash.com/photo-1586023492125-27b2c045efd7?w=600&h=400&fit=crop",
        seller_id: "user3",
        seller_name: "Emily Johnson",
        seller_email: "emily.j@university.edu",
        created_at: (2025, 1, 13, 9, 20),
        views: 67,
    },
    DemoListing {
        id: "4",
        title: "Mini Fridge (3.2 cu ft)",
        description: "Fits under a dorm bed, works perfectly.",
        price: 75.0,
        category: "Appliances",
        condition: Condition::Fair,
        location: "West Campus",
        image: "https://images.unsplash.com/photo-1571175443880-49e1d25b2bc5?w=600&h=400&fit=crop",
        seller_id: "user1",
        seller_name: "Sarah Chen",
        seller_email: "sarah.chen@university.edu",
        created_at: (2025, 1, 12, 18, 5),
        views: 31,
    },
];

fn timestamp((y, mo, d, h, mi): (i32, u32, u32, u32, u32)) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0)
        .single()
        .unwrap_or_default()
}

/// The demo listings, flagged `isDemo`.
pub fn demo_products() -> Vec<Product> {
    DEMO_LISTINGS
        .iter()
        .map(|d| Product {
            id: d.id.to_string(),
            title: d.title.to_string(),
            description: d.description.to_string(),
            price: d.price,
            category: d.category.to_string(),
            condition: Some(d.condition),
            location: d.location.to_string(),
            contact_info: d.seller_email.to_string(),
            images: vec![d.image.to_string()],
            seller_id: d.seller_id.to_string(),
            seller_name: d.seller_name.to_string(),
            seller_email: d.seller_email.to_string(),
            seller_campus: d.location.to_string(),
            is_demo: true,
            created_at: timestamp(d.created_at),
            views: d.views,
        })
        .collect()
}
