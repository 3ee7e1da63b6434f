//! Full (row + column) pivoted elimination over a candidate matrix.

use dk_core::Real;
use nalgebra::DMatrix;

/// Run `states` steps of Gaussian elimination with full pivoting on `a`,
/// recording the pivot order in `row_pivot`/`col_pivot` (permutations of
/// `0..n`, modified in place). Each step picks the largest-magnitude entry
/// over the remaining rows and the remaining *enabled* columns; ties keep
/// the incoming order, so re-running on an unchanged matrix reproduces the
/// same pivot.
///
/// Column pivoting is mandatory here: candidate columns can be
/// structurally, not just numerically, dependent, and row pivoting alone
/// cannot step over a dependent column.
///
/// Returns `Err(rank)` with the number of acceptable pivots found when no
/// entry above `threshold` remains before `states` steps complete. The
/// pivot arrays are left in their partially swapped order; callers must
/// not commit them on error.
pub(crate) fn eliminate(
    a: &DMatrix<Real>,
    mask: &[bool],
    states: usize,
    threshold: Real,
    row_pivot: &mut [usize],
    col_pivot: &mut [usize],
) -> Result<(), usize> {
    let n = row_pivot.len();
    let mut work = a.clone_owned();

    for k in 0..states {
        let mut best = threshold;
        let mut best_pos: Option<(usize, usize)> = None;
        for i in k..n {
            for j in k..n {
                if !mask[col_pivot[j]] {
                    continue;
                }
                let mag = work[(row_pivot[i], col_pivot[j])].abs();
                if mag > best {
                    best = mag;
                    best_pos = Some((i, j));
                }
            }
        }
        let Some((bi, bj)) = best_pos else {
            return Err(k);
        };
        row_pivot.swap(k, bi);
        col_pivot.swap(k, bj);

        let pr = row_pivot[k];
        let pc = col_pivot[k];
        let piv = work[(pr, pc)];
        for &r in row_pivot[k + 1..].iter() {
            let factor = work[(r, pc)] / piv;
            if factor == 0.0 {
                continue;
            }
            for &c in col_pivot[k..].iter() {
                let sub = factor * work[(pr, c)];
                work[(r, c)] -= sub;
            }
        }
    }
    Ok(())
}

/// Rank of the sub-matrix addressed by `rows` x `cols`, judged against
/// `threshold`. Used to decide whether a previously committed selection is
/// still numerically valid under the current coefficient matrix.
pub(crate) fn block_rank(
    a: &DMatrix<Real>,
    rows: &[usize],
    cols: &[usize],
    threshold: Real,
) -> usize {
    let s = rows.len().min(cols.len());
    let mut block = DMatrix::<Real>::zeros(rows.len(), cols.len());
    for (bi, &r) in rows.iter().enumerate() {
        for (bj, &c) in cols.iter().enumerate() {
            block[(bi, bj)] = a[(r, c)];
        }
    }

    let mut rp: Vec<usize> = (0..rows.len()).collect();
    let mut cp: Vec<usize> = (0..cols.len()).collect();
    for k in 0..s {
        let mut best = threshold;
        let mut best_pos: Option<(usize, usize)> = None;
        for i in k..rp.len() {
            for j in k..cp.len() {
                let mag = block[(rp[i], cp[j])].abs();
                if mag > best {
                    best = mag;
                    best_pos = Some((i, j));
                }
            }
        }
        let Some((bi, bj)) = best_pos else {
            return k;
        };
        rp.swap(k, bi);
        cp.swap(k, bj);

        let piv = block[(rp[k], cp[k])];
        for idx in k + 1..rp.len() {
            let r = rp[idx];
            let factor = block[(r, cp[k])] / piv;
            if factor == 0.0 {
                continue;
            }
            for &c in cp[k..].iter() {
                let sub = factor * block[(rp[k], c)];
                block[(r, c)] -= sub;
            }
        }
    }
    s
}

/// Number of candidates selected in `new` but not in `old`, over the
/// leading `states` block. Membership only: reordering within the block is
/// not a change of selection.
pub(crate) fn compare_leading(old: &[usize], new: &[usize], states: usize) -> usize {
    new[..states]
        .iter()
        .filter(|c| !old[..states].contains(c))
        .count()
}
