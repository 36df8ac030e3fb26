use redb::TableDefinition;

/// Host keyspace: key -> envelope-wrapped value (serialized)
///
/// One ordered table holds every record class, with `:`-separated key
/// patterns:
///
/// | purpose             | key pattern                                |
/// |---------------------|--------------------------------------------|
/// | primary user record | `{userId}:user`                            |
/// | back-reference      | `user:{userId}`                            |
/// | email index         | `email:{normalizedEmail}`                  |
/// | id counter          | `user-next-id`                             |
/// | recover code        | `recover:email:{normalizedEmail}`          |
/// | security event      | `{userId}:user:security-log:{timestampKey}`|
/// | page record         | `page:{normalizedName}`                    |
/// | salt key            | `user-salt-key`                            |
///
/// A single table (rather than one per record class) keeps the whole
/// `{userId}:` namespace a contiguous range, which the per-user bulk
/// sweep relies on.
pub const HOST: TableDefinition<&str, &[u8]> = TableDefinition::new("host");
