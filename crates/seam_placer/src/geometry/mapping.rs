//! Indirect mapping of a list of lists into buckets.
//!
//! Looks for chains of items across the lists, e.g.
//! `[[1, 2], [3, 4, 5], [6]] -> [[1, 4, 6], [2, 3], [5]]` depending on the
//! weights the operator reports. The same bucket cannot be claimed by two
//! items of one list; on contention the heaviest link wins and the loser
//! gets a fresh bucket.

/// Result of the mapping operator: best-fitting item index on the next list
/// together with the weight of the link, or `None` when nothing fits.
pub type LinkCandidate = Option<(usize, f64)>;

/// A claimed link between lists.
#[derive(Clone, Copy)]
struct Link {
  bucket_id: usize,
  weight: f64,
}

/// Replace unlinked slots with fresh bucket ids.
fn assign_buckets(links: &[Option<Link>], new_bucket_id: &mut usize) -> Vec<usize> {
  links
    .iter()
    .map(|link| match link {
      Some(link) => link.bucket_id,
      None => {
        let id = *new_bucket_id;
        *new_bucket_id += 1;
        id
      }
    })
    .collect()
}

/// Map the items of consecutive lists into buckets.
///
/// `operator(list_index, item_index)` proposes the best-fitting item on list
/// `list_index + 1` with a weight. Bucket ids are dense starting at 0 and
/// stable for the same inputs. Returns the mapping
/// `[list_index][item_index] -> bucket_id` and the bucket count.
pub fn bucket_mapping(
  list_sizes: &[usize],
  operator: impl Fn(usize, usize) -> LinkCandidate,
) -> (Vec<Vec<usize>>, usize) {
  if list_sizes.is_empty() {
    return (Vec::new(), 0);
  }

  let mut result: Vec<Vec<usize>> = Vec::with_capacity(list_sizes.len());
  result.push((0..list_sizes[0]).collect());

  let mut new_bucket_id = list_sizes[0];

  for list_index in 0..list_sizes.len() - 1 {
    // The current list already has its mapping assigned.
    let mut links: Vec<Option<Link>> = vec![None; list_sizes[list_index + 1]];

    for item_index in 0..list_sizes[list_index] {
      if let Some((next_index, weight)) = operator(list_index, item_index) {
        let link = Link {
          bucket_id: result[list_index][item_index],
          weight,
        };
        let slot = &mut links[next_index];
        if slot.is_none_or(|current| current.weight < link.weight) {
          *slot = Some(link);
        }
      }
    }
    result.push(assign_buckets(&links, &mut new_bucket_id));
  }
  (result, new_bucket_id)
}

#[cfg(test)]
#[path = "mapping_test.rs"]
mod mapping_test;
