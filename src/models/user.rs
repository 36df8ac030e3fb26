use serde::{Deserialize, Serialize};

/// Role assigned to a user account.
///
/// The first account ever created is granted `Admin` so that a fresh
/// deployment always has at least one administrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserRole {
    User,
    Admin,
}

/// User record stored in the host keyspace under `{userId}:user`.
///
/// `user_id` never changes after creation; `email` is kept normalized and is
/// unique across all records via the `email:` index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: String,
    pub username: String,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub email: String,
    /// Opaque one-way hash; compare only through the security primitive
    pub password_hash: Vec<u8>,
    pub role: UserRole,
    /// When the user was created (Unix timestamp)
    pub created_at: i64,
}

/// Registration input for creating a new user
#[derive(Debug, Clone, Default)]
pub struct RegisterRequest {
    pub username: String,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

/// Password recover code, stored TTL'd under `recover:email:{email}`.
/// One live slot per login; saving a new code overwrites the previous one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoverCode {
    pub code: String,
    pub remote_ip: String,
    /// When the code was issued (Unix timestamp)
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    const BINCODE_CONFIG: bincode::config::Configuration = bincode::config::standard();

    #[test]
    fn test_user_record_serialization() {
        let record = UserRecord {
            user_id: "u00001".to_string(),
            username: "tester".to_string(),
            first_name: "Test".to_string(),
            middle_name: String::new(),
            last_name: "T".to_string(),
            email: "test@test.com".to_string(),
            password_hash: vec![1, 2, 3],
            role: UserRole::Admin,
            created_at: 1733788800,
        };

        let bytes = bincode::serde::encode_to_vec(&record, BINCODE_CONFIG).unwrap();
        let (decoded, _): (UserRecord, _) =
            bincode::serde::decode_from_slice(&bytes, BINCODE_CONFIG).unwrap();

        assert_eq!(decoded.user_id, record.user_id);
        assert_eq!(decoded.email, record.email);
        assert_eq!(decoded.password_hash, record.password_hash);
        assert_eq!(decoded.role, UserRole::Admin);
        assert_eq!(decoded.created_at, record.created_at);
    }

    #[test]
    fn test_recover_code_serialization() {
        let rc = RecoverCode {
            code: "ABCD1234".to_string(),
            remote_ip: "10.0.0.1".to_string(),
            created_at: 1733788800,
        };
        let bytes = bincode::serde::encode_to_vec(&rc, BINCODE_CONFIG).unwrap();
        let (decoded, _): (RecoverCode, _) =
            bincode::serde::decode_from_slice(&bytes, BINCODE_CONFIG).unwrap();
        assert_eq!(decoded.code, rc.code);
        assert_eq!(decoded.remote_ip, rc.remote_ip);
    }
}
