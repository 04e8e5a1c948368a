//! SQLite storage implementation.

use std::collections::HashMap;

use color_eyre::eyre::WrapErr as _;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sqlite::{Sqlite, SqliteConnection};
use gcm_core::{Device, Message, MessageStatus};

use crate::models::*;
use crate::schema::*;
use crate::traits::*;
use crate::{DeviceFilter, StoreError};

type SqlitePool = Pool<ConnectionManager<SqliteConnection>>;

/// SQLite-based storage.
#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Create a new SQLite storage from a database URL.
    pub fn new(database_url: &str) -> color_eyre::eyre::Result<Self> {
        Self::with_pool_size(database_url, 10)
    }

    /// Create a migrated, private in-memory database.
    ///
    /// The pool holds a single connection since every `:memory:` connection
    /// opens its own database.
    pub fn in_memory() -> color_eyre::eyre::Result<Self> {
        let storage = Self::with_pool_size(":memory:", 1)?;
        storage.run_migrations()?;
        Ok(storage)
    }

    fn with_pool_size(database_url: &str, max_size: u32) -> color_eyre::eyre::Result<Self> {
        let manager = ConnectionManager::<SqliteConnection>::new(database_url);
        let pool = Pool::builder()
            .max_size(max_size)
            .build(manager)
            .wrap_err("failed to create connection pool")?;

        Ok(Self { pool })
    }

    /// Run migrations.
    pub fn run_migrations(&self) -> color_eyre::eyre::Result<()> {
        use diesel_migrations::MigrationHarness as _;

        let mut conn = self
            .pool
            .get()
            .wrap_err("failed to get connection for migrations")?;

        let applied = conn
            .run_pending_migrations(crate::MIGRATIONS)
            .map_err(|e| color_eyre::eyre::eyre!("migration failed: {}", e))?;

        tracing::debug!(applied = applied.len(), "migrations complete");

        Ok(())
    }

    fn conn(
        &self,
    ) -> color_eyre::eyre::Result<PooledConnection<ConnectionManager<SqliteConnection>>> {
        self.pool
            .get()
            .wrap_err("failed to get database connection")
    }
}

impl DeviceStore for SqliteStorage {
    fn find_device(&self, device_id: &str) -> color_eyre::eyre::Result<Option<Device>> {
        let mut conn = self.conn()?;

        let result: Option<DeviceRow> = devices::table
            .filter(devices::device_id.eq(device_id))
            .select(DeviceRow::as_select())
            .first(&mut conn)
            .optional()
            .wrap_err("failed to find device")?;

        Ok(result.map(Device::from))
    }

    fn filter_devices(&self, filter: &DeviceFilter) -> color_eyre::eyre::Result<Vec<Device>> {
        let mut conn = self.conn()?;

        let mut query: devices::BoxedQuery<'_, Sqlite> = devices::table.into_boxed();

        if let Some(ids) = &filter.device_ids {
            query = query.filter(devices::device_id.eq_any(ids.clone()));
        }
        if let Some(tokens) = &filter.registration_tokens {
            query = query.filter(devices::registration_token.eq_any(tokens.clone()));
        }
        if let Some(active) = filter.active {
            query = query.filter(devices::is_active.eq(active));
        }

        let rows: Vec<DeviceRow> = query
            .order(devices::modified_at.desc())
            .load(&mut conn)
            .wrap_err("failed to filter devices")?;

        Ok(rows.into_iter().map(Device::from).collect())
    }

    fn save_device(&self, device: &Device) -> color_eyre::eyre::Result<()> {
        let mut conn = self.conn()?;
        let row = NewDevice::from(device);

        // Conflicts on device_id become updates; any remaining unique
        // violation is the registration token.
        let result = diesel::insert_into(devices::table)
            .values(&row)
            .on_conflict(devices::device_id)
            .do_update()
            .set((
                devices::registration_token.eq(row.registration_token),
                devices::display_name.eq(row.display_name),
                devices::is_active.eq(row.is_active),
                devices::modified_at.eq(row.modified_at),
            ))
            .execute(&mut conn);

        match result {
            Ok(_) => Ok(()),
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                tracing::debug!(
                    device_id = %device.device_id,
                    "registration token already held by another device"
                );
                Err(StoreError::TokenConflict {
                    token: device.registration_token.clone(),
                }
                .into())
            }
            Err(e) => Err::<(), _>(e).wrap_err("failed to save device"),
        }
    }

    fn delete_soft_device(&self, device_id: &str) -> color_eyre::eyre::Result<bool> {
        let mut conn = self.conn()?;
        let now = chrono::Utc::now().naive_utc();

        let updated = diesel::update(devices::table.filter(devices::device_id.eq(device_id)))
            .set((devices::is_active.eq(false), devices::modified_at.eq(now)))
            .execute(&mut conn)
            .wrap_err("failed to deactivate device")?;

        Ok(updated > 0)
    }
}

impl MessageStore for SqliteStorage {
    fn save_message(&self, message: &Message) -> color_eyre::eyre::Result<()> {
        let mut conn = self.conn()?;
        let row = NewMessage::from(message);

        conn.transaction::<_, DieselError, _>(|conn| {
            diesel::insert_into(messages::table)
                .values(&row)
                .on_conflict(messages::id)
                .do_update()
                .set((
                    messages::topic.eq(row.topic),
                    messages::payload.eq(row.payload),
                    messages::response.eq(row.response),
                    messages::status.eq(row.status),
                ))
                .execute(conn)?;

            diesel::delete(message_devices::table.filter(message_devices::message_id.eq(&row.id)))
                .execute(conn)?;

            for device_id in &message.devices {
                diesel::insert_into(message_devices::table)
                    .values(NewMessageDevice {
                        message_id: row.id.as_str(),
                        device_id: device_id.as_str(),
                    })
                    .execute(conn)?;
            }

            Ok(())
        })
        .wrap_err("failed to save message")?;

        Ok(())
    }

    fn find_message(&self, id: &uuid::Uuid) -> color_eyre::eyre::Result<Option<Message>> {
        let mut conn = self.conn()?;
        let id = id.to_string();

        let result: Option<MessageRow> = messages::table
            .filter(messages::id.eq(&id))
            .select(MessageRow::as_select())
            .first(&mut conn)
            .optional()
            .wrap_err("failed to find message")?;

        let Some(row) = result else {
            return Ok(None);
        };

        let devices: Vec<String> = message_devices::table
            .filter(message_devices::message_id.eq(&id))
            .select(message_devices::device_id)
            .order(message_devices::device_id.asc())
            .load(&mut conn)
            .wrap_err("failed to load message devices")?;

        row.into_message(devices).map(Some)
    }

    fn messages_with_status(
        &self,
        status: MessageStatus,
    ) -> color_eyre::eyre::Result<Vec<Message>> {
        let mut conn = self.conn()?;

        let rows: Vec<MessageRow> = messages::table
            .filter(messages::status.eq(status.as_str()))
            .order(messages::created_at.desc())
            .select(MessageRow::as_select())
            .load(&mut conn)
            .wrap_err("failed to load messages by status")?;

        let ids: Vec<String> = rows.iter().map(|row| row.id.clone()).collect();
        let links: Vec<(String, String)> = message_devices::table
            .filter(message_devices::message_id.eq_any(ids))
            .select((message_devices::message_id, message_devices::device_id))
            .order(message_devices::device_id.asc())
            .load(&mut conn)
            .wrap_err("failed to load message devices")?;

        let mut devices_by_message: HashMap<String, Vec<String>> = HashMap::new();
        for (message_id, device_id) in links {
            devices_by_message
                .entry(message_id)
                .or_default()
                .push(device_id);
        }

        rows.into_iter()
            .map(|row| {
                let devices = devices_by_message.remove(&row.id).unwrap_or_default();
                row.into_message(devices)
            })
            .collect()
    }
}
