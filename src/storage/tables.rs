use redb::{MultimapTableDefinition, TableDefinition};

/// User records: id -> UserRecord (msgpack)
pub const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

/// Email index: email -> user id (enforces uniqueness)
pub const USER_EMAILS: TableDefinition<&str, &str> = TableDefinition::new("user_emails");

/// Node records: id -> NodeRecord (msgpack)
pub const NODES: TableDefinition<&str, &[u8]> = TableDefinition::new("nodes");

/// Children index: (owner id, parent key) -> node ids, ascending (creation order)
pub const NODE_CHILDREN: MultimapTableDefinition<(&str, &str), &str> =
    MultimapTableDefinition::new("node_children");

/// Job records: id -> JobRecord (msgpack)
pub const JOBS: TableDefinition<&str, &[u8]> = TableDefinition::new("jobs");

/// Queued jobs per queue name: name -> job ids, ascending (enqueue order)
pub const PENDING_JOBS: MultimapTableDefinition<&str, &str> =
    MultimapTableDefinition::new("pending_jobs");
