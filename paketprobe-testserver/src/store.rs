use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use serde_json::{Map, Value};

/// Hashes of the seeded paket rows; favorites tests reference these.
pub const SEED_MD5_HASHES: [&str; 3] = [
    "032477c9bdd128dd1e1c3b3b7fe283f4",
    "1366f6f446e18cd51b472f28fdc42b2d",
    "5a1f0c8e2b7d4e6f9a3c1b0d8e7f6a5b",
];

#[derive(Debug, Clone, Serialize)]
pub(crate) struct User {
    pub id: u64,
    pub username: String,
    pub email: String,
    pub full_name: String,
    #[serde(skip)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct Favorite {
    pub md5_hash: String,
    pub notes: Option<String>,
    pub nama_paket: Option<String>,
}

#[derive(Debug)]
pub(crate) struct Store {
    next_user_id: u64,
    next_paket_id: u64,
    next_token: u64,
    users: BTreeMap<u64, User>,
    sessions: HashMap<String, u64>,
    /// Paket rows keyed by id; each row is the JSON object as submitted.
    paket: BTreeMap<u64, Map<String, Value>>,
    created_paket: u64,
    favorites: BTreeMap<u64, Vec<Favorite>>,
}

impl Default for Store {
    fn default() -> Self {
        let mut store = Self {
            next_user_id: 1,
            next_paket_id: 1,
            next_token: 1,
            users: BTreeMap::new(),
            sessions: HashMap::new(),
            paket: BTreeMap::new(),
            created_paket: 0,
            favorites: BTreeMap::new(),
        };

        let seeds = [
            ("Pengadaan Laptop Kantor", "PKT-001", 150_000_000.0),
            ("Renovasi Gedung Dinas", "PKT-002", 980_000_000.0),
            ("Pengadaan Server Data Center", "PKT-003", 2_400_000_000.0),
        ];
        for ((nama, kode, pagu), md5) in seeds.into_iter().zip(SEED_MD5_HASHES) {
            let mut row = Map::new();
            row.insert("nama_paket".to_string(), Value::from(nama));
            row.insert("kode_paket".to_string(), Value::from(kode));
            row.insert("nilai_pagu_paket".to_string(), Value::from(pagu));
            row.insert("md5_hash".to_string(), Value::from(md5));
            row.insert("tanggal_pembuatan".to_string(), Value::from("2024-01-01"));
            store.insert_paket(row);
        }
        store.created_paket = 0;
        store
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StoreError {
    NotFound,
    Conflict,
    Unauthorized,
}

impl Store {
    pub(crate) fn register(
        &mut self,
        username: &str,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<(User, String), StoreError> {
        if self.users.values().any(|u| u.email == email) {
            return Err(StoreError::Conflict);
        }
        let id = self.next_user_id;
        self.next_user_id += 1;
        let user = User {
            id,
            username: username.to_string(),
            email: email.to_string(),
            full_name: full_name.to_string(),
            password: password.to_string(),
        };
        self.users.insert(id, user.clone());
        let token = self.issue_token(id);
        Ok((user, token))
    }

    pub(crate) fn login(&mut self, email: &str, password: &str) -> Result<(User, String), StoreError> {
        let user = self
            .users
            .values()
            .find(|u| u.email == email && u.password == password)
            .cloned()
            .ok_or(StoreError::Unauthorized)?;
        let token = self.issue_token(user.id);
        Ok((user, token))
    }

    fn issue_token(&mut self, user_id: u64) -> String {
        let token = format!("tok-{user_id}-{}", self.next_token);
        self.next_token += 1;
        self.sessions.insert(token.clone(), user_id);
        token
    }

    pub(crate) fn user_for_token(&self, token: &str) -> Option<u64> {
        let id = *self.sessions.get(token)?;
        self.users.contains_key(&id).then_some(id)
    }

    pub(crate) fn user(&self, id: u64) -> Option<&User> {
        self.users.get(&id)
    }

    pub(crate) fn update_profile(
        &mut self,
        id: u64,
        username: Option<&str>,
        full_name: Option<&str>,
    ) -> Result<User, StoreError> {
        let user = self.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        if let Some(v) = username {
            user.username = v.to_string();
        }
        if let Some(v) = full_name {
            user.full_name = v.to_string();
        }
        Ok(user.clone())
    }

    pub(crate) fn change_password(
        &mut self,
        id: u64,
        current: &str,
        new: &str,
    ) -> Result<(), StoreError> {
        let user = self.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        if user.password != current {
            return Err(StoreError::Unauthorized);
        }
        user.password = new.to_string();
        Ok(())
    }

    pub(crate) fn delete_user(&mut self, id: u64) -> Result<(), StoreError> {
        self.users.remove(&id).ok_or(StoreError::NotFound)?;
        self.sessions.retain(|_, uid| *uid != id);
        self.favorites.remove(&id);
        Ok(())
    }

    pub(crate) fn insert_paket(&mut self, mut row: Map<String, Value>) -> Map<String, Value> {
        let id = self.next_paket_id;
        self.next_paket_id += 1;
        self.created_paket += 1;
        row.insert("id".to_string(), Value::from(id));
        self.paket.insert(id, row.clone());
        row
    }

    pub(crate) fn paket(&self, id: u64) -> Option<&Map<String, Value>> {
        self.paket.get(&id)
    }

    pub(crate) fn update_paket(
        &mut self,
        id: u64,
        patch: Map<String, Value>,
    ) -> Result<Map<String, Value>, StoreError> {
        let row = self.paket.get_mut(&id).ok_or(StoreError::NotFound)?;
        for (k, v) in patch {
            if k != "id" {
                row.insert(k, v);
            }
        }
        Ok(row.clone())
    }

    pub(crate) fn delete_paket(&mut self, id: u64) -> Result<(), StoreError> {
        self.paket.remove(&id).map(|_| ()).ok_or(StoreError::NotFound)
    }

    /// Newest first, optionally filtered by `nama_paket`/`kode_paket` substring.
    pub(crate) fn list_paket(&self, q: &str, page: u64, limit: u64) -> (Vec<Value>, u64) {
        let needle = q.to_ascii_lowercase();
        let matches = |row: &Map<String, Value>| {
            if needle.is_empty() {
                return true;
            }
            ["nama_paket", "kode_paket"].iter().any(|field| {
                row.get(*field)
                    .and_then(Value::as_str)
                    .is_some_and(|s| s.to_ascii_lowercase().contains(&needle))
            })
        };

        let filtered: Vec<&Map<String, Value>> =
            self.paket.values().rev().filter(|r| matches(r)).collect();
        let total = filtered.len() as u64;
        let offset = page.saturating_sub(1).saturating_mul(limit);
        let rows = filtered
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .map(|r| Value::Object(r.clone()))
            .collect();
        (rows, total)
    }

    pub(crate) fn paket_counts(&self) -> (u64, u64) {
        (self.paket.len() as u64, self.created_paket)
    }

    pub(crate) fn favorites(&self, user_id: u64) -> &[Favorite] {
        self.favorites.get(&user_id).map_or(&[][..], Vec::as_slice)
    }

    pub(crate) fn add_favorite(
        &mut self,
        user_id: u64,
        md5_hash: &str,
        notes: Option<String>,
    ) -> Result<Favorite, StoreError> {
        let nama_paket = self
            .paket
            .values()
            .find(|r| r.get("md5_hash").and_then(Value::as_str) == Some(md5_hash))
            .map(|r| {
                r.get("nama_paket")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .ok_or(StoreError::NotFound)?;

        let list = self.favorites.entry(user_id).or_default();
        if list.iter().any(|f| f.md5_hash == md5_hash) {
            return Err(StoreError::Conflict);
        }
        let fav = Favorite {
            md5_hash: md5_hash.to_string(),
            notes,
            nama_paket,
        };
        list.push(fav.clone());
        Ok(fav)
    }

    pub(crate) fn remove_favorite(&mut self, user_id: u64, md5_hash: &str) -> Result<(), StoreError> {
        let list = self.favorites.entry(user_id).or_default();
        let before = list.len();
        list.retain(|f| f.md5_hash != md5_hash);
        if list.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    pub(crate) fn clear_favorites(&mut self, user_id: u64) -> usize {
        self.favorites.remove(&user_id).map_or(0, |l| l.len())
    }
}
