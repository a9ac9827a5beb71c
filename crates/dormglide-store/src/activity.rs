//! Per-user activity log (views, purchases, sales, favourites, messages,
//! searches). Always local.
//!
//! The `user_activity` document maps user id to [`Activity`]. Capped lists
//! keep the newest entries at the front.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use dormglide_shared::constants::{
    KEY_USER_ACTIVITY, MAX_MESSAGE_ENTRIES, MAX_SEARCH_ENTRIES, MAX_VIEW_ENTRIES,
};
use dormglide_shared::{
    Activity, FavoriteEntry, MessageDirection, MessageEntry, PurchaseEntry, SaleEntry, SearchEntry,
    UserProfile, ViewEntry,
};

use crate::database::Database;
use crate::error::{Result, StoreError};

/// A chat message as it is written into both participants' logs.
#[derive(Debug, Clone)]
pub struct MessageActivity<'a> {
    pub sender_id: &'a str,
    pub receiver_id: &'a str,
    pub product_id: Option<&'a str>,
    pub product_title: &'a str,
    pub body: &'a str,
    pub conversation_id: Option<&'a str>,
    pub timestamp: DateTime<Utc>,
}

fn push_front_capped<T>(list: &mut Vec<T>, entry: T, cap: usize) {
    list.insert(0, entry);
    list.truncate(cap);
}

impl Database {
    fn all_activity(&self) -> Result<HashMap<String, Activity>> {
        self.read_json_or_default(KEY_USER_ACTIVITY)
    }

    /// Activity of `user_id`, empty when nothing was recorded.
    pub fn activity_for(&self, user_id: &str) -> Result<Activity> {
        Ok(self.all_activity()?.remove(user_id).unwrap_or_default())
    }

    fn modify_activity<R>(
        &self,
        user_id: &str,
        f: impl FnOnce(&mut Activity) -> Result<R>,
    ) -> Result<R> {
        let mut all = self.all_activity()?;
        let activity = all.entry(user_id.to_string()).or_default();
        let out = f(activity)?;
        self.write_json(KEY_USER_ACTIVITY, &all)?;
        Ok(out)
    }

    fn bump_user(&self, user_id: &str, f: impl FnOnce(&mut UserProfile)) -> Result<()> {
        if let Some(mut user) = self.get_user(user_id)? {
            f(&mut user);
            self.upsert_user(&user)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Tracking
    // ------------------------------------------------------------------

    pub fn track_view(&self, user_id: &str, product_id: &str, product_title: &str) -> Result<()> {
        self.modify_activity(user_id, |a| {
            push_front_capped(
                &mut a.views,
                ViewEntry {
                    product_id: product_id.into(),
                    product_title: product_title.into(),
                    timestamp: Utc::now(),
                },
                MAX_VIEW_ENTRIES,
            );
            Ok(())
        })
    }

    /// Record a purchase and bump the buyer's `totalPurchases`.
    pub fn track_purchase(
        &self,
        user_id: &str,
        product_id: &str,
        product_title: &str,
        price: f64,
        seller_id: &str,
    ) -> Result<()> {
        self.modify_activity(user_id, |a| {
            a.purchases.push(PurchaseEntry {
                product_id: product_id.into(),
                product_title: product_title.into(),
                price,
                seller_id: seller_id.into(),
                timestamp: Utc::now(),
                status: "completed".into(),
            });
            Ok(())
        })?;
        self.bump_user(user_id, |u| u.total_purchases += 1)
    }

    /// Record a sale and bump the seller's `totalSales`.
    pub fn track_sale(
        &self,
        seller_id: &str,
        product_id: &str,
        product_title: &str,
        price: f64,
        buyer_id: &str,
    ) -> Result<()> {
        self.modify_activity(seller_id, |a| {
            a.sales.push(SaleEntry {
                product_id: product_id.into(),
                product_title: product_title.into(),
                price,
                buyer_id: buyer_id.into(),
                timestamp: Utc::now(),
                status: "completed".into(),
            });
            Ok(())
        })?;
        self.bump_user(seller_id, |u| u.total_sales += 1)
    }

    /// Add a favourite. A product can be favourited once per user.
    pub fn add_favorite(&self, user_id: &str, product_id: &str, product_title: &str) -> Result<()> {
        self.modify_activity(user_id, |a| {
            if a.favorites.iter().any(|f| f.product_id == product_id) {
                return Err(StoreError::Conflict("Already in favorites".into()));
            }
            a.favorites.push(FavoriteEntry {
                product_id: product_id.into(),
                product_title: product_title.into(),
                timestamp: Utc::now(),
            });
            Ok(())
        })
    }

    /// Returns `true` if a favourite was removed.
    pub fn remove_favorite(&self, user_id: &str, product_id: &str) -> Result<bool> {
        self.modify_activity(user_id, |a| {
            let before = a.favorites.len();
            a.favorites.retain(|f| f.product_id != product_id);
            Ok(a.favorites.len() != before)
        })
    }

    pub fn is_favorited(&self, user_id: &str, product_id: &str) -> Result<bool> {
        Ok(self
            .activity_for(user_id)?
            .favorites
            .iter()
            .any(|f| f.product_id == product_id))
    }

    pub fn track_search(&self, user_id: &str, term: &str, results_count: u32) -> Result<()> {
        self.modify_activity(user_id, |a| {
            push_front_capped(
                &mut a.searches,
                SearchEntry {
                    term: term.into(),
                    results_count,
                    timestamp: Utc::now(),
                },
                MAX_SEARCH_ENTRIES,
            );
            Ok(())
        })
    }

    /// Write a message into the sender's log (outgoing) and the receiver's
    /// log (incoming).
    pub fn record_message(&self, msg: &MessageActivity<'_>) -> Result<()> {
        let entry = |direction| MessageEntry {
            product_id: msg.product_id.map(str::to_string),
            product_title: msg.product_title.to_string(),
            message: msg.body.to_string(),
            sender_id: msg.sender_id.to_string(),
            receiver_id: msg.receiver_id.to_string(),
            timestamp: msg.timestamp,
            conversation_id: msg.conversation_id.map(str::to_string),
            direction,
        };

        let mut all = self.all_activity()?;
        for (user_id, direction) in [
            (msg.sender_id, MessageDirection::Outgoing),
            (msg.receiver_id, MessageDirection::Incoming),
        ] {
            let activity = all.entry(user_id.to_string()).or_default();
            push_front_capped(&mut activity.messages, entry(direction), MAX_MESSAGE_ENTRIES);
        }
        self.write_json(KEY_USER_ACTIVITY, &all)
    }
}
