use chrono::Utc;
use redb::ReadableTable;

use super::db::{new_record_id, Database, DatabaseError};
use super::models::{parent_key, NewNode, NodeRecord};
use super::tables::*;

impl Database {
    // ========================================================================
    // Node operations
    // ========================================================================

    /// Store a new node and add it to its parent's children index
    pub fn insert_node(&self, node: NewNode) -> Result<NodeRecord, DatabaseError> {
        debug_assert!(!node.user_id.is_empty(), "node owner must not be empty");
        debug_assert!(!node.name.is_empty(), "node name must not be empty");

        let record = NodeRecord {
            id: new_record_id(),
            user_id: node.user_id,
            name: node.name,
            parent_id: node.parent_id,
            is_public: node.is_public,
            content: node.content,
            created_at: Utc::now(),
        };

        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(NODES)?;
            let data = rmp_serde::to_vec_named(&record)?;
            table.insert(record.id.as_str(), data.as_slice())?;

            let mut children = write_txn.open_multimap_table(NODE_CHILDREN)?;
            children.insert(
                (
                    record.user_id.as_str(),
                    parent_key(record.parent_id.as_deref()),
                ),
                record.id.as_str(),
            )?;
        }
        write_txn.commit()?;
        Ok(record)
    }

    /// Get a node by id regardless of owner
    pub fn get_node(&self, id: &str) -> Result<Option<NodeRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(NODES)?;

        match table.get(id)? {
            Some(data) => {
                let node: NodeRecord = rmp_serde::from_slice(data.value())?;
                Ok(Some(node))
            }
            None => Ok(None),
        }
    }

    /// Get a node by id, only if it belongs to `user_id`
    pub fn get_owned_node(
        &self,
        user_id: &str,
        id: &str,
    ) -> Result<Option<NodeRecord>, DatabaseError> {
        Ok(self.get_node(id)?.filter(|node| node.user_id == user_id))
    }

    /// Set the visibility flag of a node owned by `user_id`.
    /// Returns the updated node, or `None` if no such node exists for that owner.
    pub fn set_node_visibility(
        &self,
        user_id: &str,
        id: &str,
        is_public: bool,
    ) -> Result<Option<NodeRecord>, DatabaseError> {
        let write_txn = self.begin_write()?;

        let existing = {
            let table = write_txn.open_table(NODES)?;
            let result = match table.get(id)? {
                Some(data) => {
                    let node: NodeRecord = rmp_serde::from_slice(data.value())?;
                    Some(node)
                }
                None => None,
            };
            result
        };

        let updated = match existing.filter(|node| node.user_id == user_id) {
            Some(mut node) => {
                node.is_public = is_public;
                let serialized = rmp_serde::to_vec_named(&node)?;
                let mut table = write_txn.open_table(NODES)?;
                table.insert(id, serialized.as_slice())?;
                Some(node)
            }
            None => None,
        };

        write_txn.commit()?;
        Ok(updated)
    }

    /// List the nodes owned by `user_id` directly under `parent_id` (root when
    /// `None`), in creation order.
    pub fn list_children(
        &self,
        user_id: &str,
        parent_id: Option<&str>,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<NodeRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let children = read_txn.open_multimap_table(NODE_CHILDREN)?;
        let nodes = read_txn.open_table(NODES)?;

        let ids: Vec<String> = children
            .get((user_id, parent_key(parent_id)))?
            .skip(skip)
            .take(limit)
            .map(|r| r.map(|v| v.value().to_string()))
            .collect::<Result<Vec<_>, _>>()?;

        let mut page = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(data) = nodes.get(id.as_str())? {
                let node: NodeRecord = rmp_serde::from_slice(data.value())?;
                page.push(node);
            }
        }

        Ok(page)
    }
}
