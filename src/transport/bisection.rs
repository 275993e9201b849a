/*
Copyright 2021 Jakub Lewandowski

This file is part of Atmospheric Meridional Energy Transport (AMET).

Atmospheric Meridional Energy Transport (AMET) is a free software: you can redistribute it and/or modify
it under the terms of the GNU General Public License as published by
the Free Software Foundation; either version 3 of the License, or
(at your option) any later version.

Atmospheric Meridional Energy Transport (AMET) is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
GNU General Public License for more details.

You should have received a copy of the GNU General Public License
along with Atmospheric Meridional Energy Transport (AMET). If not, see https://www.gnu.org/licenses/.
*/

//! Module with binary search (bisection) of grid coordinates
//! closest to requested values. Coordinates can be sorted
//! ascendingly or descendingly, as latitudes often are.

use crate::{errors::SearchError, Float};

/// Binary search for the first index at or past `x`
/// in the direction of sorting.
fn binary_search(array: &[Float], x: Float) -> Result<usize, SearchError> {
    if array.is_empty() {
        return Err(SearchError::EmptyArray);
    }

    let first = array[0];
    let last = array[array.len() - 1];

    if x < first && x < last || x > first && x > last || x.is_nan() {
        return Err(SearchError::OutOfBounds);
    }

    let ascending = first <= last;

    let mut lo = 0;
    let mut hi = array.len() - 1;

    while lo < hi {
        let mid = (lo + hi) / 2;

        let past = if ascending { array[mid] >= x } else { array[mid] <= x };

        if past {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }

    Ok(lo)
}

/// Finds the index of the closest coordinate not past `x`
/// in the direction of sorting.
pub fn find_left_closest(array: &[Float], x: Float) -> Result<usize, SearchError> {
    let found = binary_search(array, x)?;

    if array[found] == x || found == 0 {
        Ok(found)
    } else {
        Ok(found - 1)
    }
}

/// Finds the index of the coordinate nearest to `x`.
pub fn find_nearest(array: &[Float], x: Float) -> Result<usize, SearchError> {
    let left = find_left_closest(array, x)?;
    let right = (left + 1).min(array.len() - 1);

    if (array[right] - x).abs() < (array[left] - x).abs() {
        Ok(right)
    } else {
        Ok(left)
    }
}
