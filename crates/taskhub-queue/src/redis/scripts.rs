//! Lua scripts executed atomically by Redis.
//!
//! Job state lives in the job hash field `state`:
//! `waiting`, `active`, `completed` or `failed`.

/// KEYS: waiting, failed, job. ARGV: id, name, payload, max_attempts, now.
///
/// Returns 1 when enqueued, 0 when the id is already waiting or active.
pub const ENQUEUE: &str = r#"
local state = redis.call('HGET', KEYS[3], 'state')
if state == 'waiting' or state == 'active' then
  return 0
end
redis.call('LREM', KEYS[2], 0, ARGV[1])
redis.call('DEL', KEYS[3])
redis.call('HSET', KEYS[3], 'name', ARGV[2], 'payload', ARGV[3],
  'max_attempts', ARGV[4], 'attempts', 0, 'state', 'waiting', 'enqueued_at', ARGV[5])
redis.call('LPUSH', KEYS[1], ARGV[1])
return 1
"#;

/// KEYS: waiting, active. ARGV: job prefix, lock prefix, token, lease ms,
/// worker, now.
///
/// Returns nil when nothing waits, else `{id, name, payload, max_attempts,
/// attempts}`.
pub const RESERVE: &str = r#"
local id = redis.call('RPOPLPUSH', KEYS[1], KEYS[2])
if not id then
  return false
end
local job = ARGV[1] .. id
redis.call('SET', ARGV[2] .. id, ARGV[3], 'PX', ARGV[4])
local attempts = redis.call('HINCRBY', job, 'attempts', 1)
redis.call('HSET', job, 'state', 'active', 'worker', ARGV[5], 'reserved_at', ARGV[6])
local fields = redis.call('HMGET', job, 'name', 'payload', 'max_attempts')
return {id, fields[1], fields[2], fields[3], attempts}
"#;

/// KEYS: lock. ARGV: token, lease ms. Returns 1 when extended.
pub const EXTEND: &str = r#"
if redis.call('GET', KEYS[1]) ~= ARGV[1] then
  return 0
end
return redis.call('PEXPIRE', KEYS[1], ARGV[2])
"#;

/// KEYS: lock, active, job. ARGV: token, id, retention s, now.
///
/// Returns 1 when completed, 0 when the lease is gone.
pub const COMPLETE: &str = r#"
if redis.call('GET', KEYS[1]) ~= ARGV[1] then
  return 0
end
redis.call('DEL', KEYS[1])
redis.call('LREM', KEYS[2], 0, ARGV[2])
redis.call('HSET', KEYS[3], 'state', 'completed', 'finished_at', ARGV[4])
redis.call('EXPIRE', KEYS[3], ARGV[3])
return 1
"#;

/// KEYS: lock, active, waiting, failed, job. ARGV: token, id, error,
/// retry (1 or 0), retention s, now.
///
/// Returns -1 when the lease is gone, 1 when requeued, 0 when moved to the
/// failed list.
pub const FAIL: &str = r#"
if redis.call('GET', KEYS[1]) ~= ARGV[1] then
  return -1
end
redis.call('DEL', KEYS[1])
redis.call('LREM', KEYS[2], 0, ARGV[2])
redis.call('HSET', KEYS[5], 'last_error', ARGV[3], 'finished_at', ARGV[6])
local attempts = tonumber(redis.call('HGET', KEYS[5], 'attempts') or '0')
local max = tonumber(redis.call('HGET', KEYS[5], 'max_attempts') or '1')
if ARGV[4] == '1' and attempts < max then
  redis.call('HSET', KEYS[5], 'state', 'waiting')
  redis.call('LPUSH', KEYS[3], ARGV[2])
  return 1
end
redis.call('HSET', KEYS[5], 'state', 'failed')
redis.call('LPUSH', KEYS[4], ARGV[2])
redis.call('EXPIRE', KEYS[5], ARGV[5])
return 0
"#;

/// KEYS: active, waiting, failed. ARGV: lock prefix, job prefix,
/// retention s, now.
///
/// Active jobs without a lease go back to the front of the waiting list
/// while attempts remain, otherwise to the failed list. Returns `{requeued,
/// exhausted}` where `exhausted` holds `{id, name, payload, max_attempts,
/// attempts, reserved_at}` rows.
pub const RECOVER_STALLED: &str = r#"
local ids = redis.call('LRANGE', KEYS[1], 0, -1)
local requeued = 0
local exhausted = {}
for _, id in ipairs(ids) do
  if redis.call('EXISTS', ARGV[1] .. id) == 0 then
    local job = ARGV[2] .. id
    redis.call('LREM', KEYS[1], 0, id)
    local fields = redis.call('HMGET', job, 'name', 'payload', 'max_attempts', 'attempts', 'reserved_at')
    local max = tonumber(fields[3] or '1')
    local attempts = tonumber(fields[4] or '0')
    if attempts < max then
      redis.call('HSET', job, 'state', 'waiting')
      redis.call('RPUSH', KEYS[2], id)
      requeued = requeued + 1
    else
      redis.call('HSET', job, 'state', 'failed', 'finished_at', ARGV[4], 'last_error',
        'Job stalled: lease expired on attempt ' .. attempts .. ' of ' .. max)
      redis.call('LPUSH', KEYS[3], id)
      redis.call('EXPIRE', job, ARGV[3])
      table.insert(exhausted, {id, fields[1] or '', fields[2] or 'null', max, attempts,
        tonumber(fields[5] or '0')})
    end
  end
end
return {requeued, exhausted}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use taskhub_core::traits::queue::stalled_error;

    #[test]
    fn test_stalled_error_matches_recover_script() {
        let sample = stalled_error(3, 3);
        let prefix = sample.trim_end_matches("3 of 3");
        assert!(RECOVER_STALLED.contains(&format!("'{prefix}'")));
        assert!(RECOVER_STALLED.contains("' of '"));
    }

    #[test]
    fn test_reserve_and_recover_agree_on_attempt_fields() {
        assert!(RESERVE.contains("HINCRBY', job, 'attempts', 1"));
        assert!(RECOVER_STALLED.contains("'max_attempts', 'attempts'"));
        assert!(RECOVER_STALLED.contains("if attempts < max then"));
    }
}
